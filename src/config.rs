use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RelmapConfig {
    pub database: Option<String>,
    /// `tracing` filter directive used when `--verbose` is not given
    pub log_filter: Option<String>,
}

impl RelmapConfig {
    /// Configured database path, or the default under `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        self.database
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(base))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("relmap.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".relmap").join("relmap.db")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<RelmapConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RelmapConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RelmapConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("relmap.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relmap.toml");
        let config = RelmapConfig {
            database: Some("data/app.db".into()),
            log_filter: Some("relmap=trace".into()),
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
    }

    #[test]
    fn test_write_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relmap.toml");
        write_config(&path, &RelmapConfig::default(), false).unwrap();

        let err = write_config(&path, &RelmapConfig::default(), false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        write_config(&path, &RelmapConfig::default(), true).unwrap();
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relmap.toml");
        std::fs::write(&path, "database = [").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_database_path_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = RelmapConfig::default().database_path(dir.path());
        assert_eq!(db, dir.path().join(".relmap").join("relmap.db"));

        ensure_db_dir(&db).unwrap();
        assert!(dir.path().join(".relmap").is_dir());
    }
}
