//! Relmap CLI - inspect databases written by the relational record mapper

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use relmap::config::{self, RelmapConfig};
use relmap::storage::SqliteStore;
use relmap::{naming, ui, RowStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "relmap")]
#[command(version = "0.0.1")]
#[command(about = "Relational record mapper - inspect persisted records")]
#[command(long_about = r#"
Relmap persists records and their relationships into SQLite.
This tool sets up a project database and inspects what was stored.

Example usage:
  relmap init
  relmap tables
  relmap rows --table hero --limit 20 --json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write relmap.toml and create the database file
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// List tables with their row counts
    Tables {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print the rows of one table
    Rows {
        /// Table name
        #[arg(short, long)]
        table: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load_config(Some(&config_path))?.unwrap_or_default();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(settings.log_filter.as_deref().unwrap_or("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { database, force } => {
            let database = database.unwrap_or_else(|| config::default_database_path_in(Path::new(".")));
            let new_config = RelmapConfig {
                database: Some(database.to_string_lossy().to_string()),
                ..settings
            };

            config::write_config(&config_path, &new_config, force)?;
            config::ensure_db_dir(&database)?;
            SqliteStore::open(&database)?;

            println!("Wrote {}", config_path.display());
            println!("Database: {}", database.display());
        }

        Commands::Tables { database } => {
            let database = resolve_database(database, &settings);
            let store = open_existing(&database)?;
            let stats = store.stats()?;

            if stats.tables.is_empty() {
                println!("No tables in {}", database.display());
            } else {
                println!("{}", ui::stats_table(&stats));
                println!("Total rows: {}", stats.total_rows());
            }
        }

        Commands::Rows { table, database, limit, json } => {
            let database = resolve_database(database, &settings);
            let store = open_existing(&database)?;
            let table = naming::sql_identifier(&table)?;

            if !store.list_tables()?.contains(&table) {
                anyhow::bail!("no table named {} in {}", table, database.display());
            }

            let rows = store.query_rows(&table, None, limit)?;
            tracing::debug!("Read {} row(s) from {}", rows.len(), table);

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("{} is empty", table);
            } else {
                println!("{}", ui::rows_table(&rows));
            }
        }
    }

    Ok(())
}

fn resolve_database(database: Option<PathBuf>, settings: &RelmapConfig) -> PathBuf {
    database.unwrap_or_else(|| settings.database_path(Path::new(".")))
}

fn open_existing(database: &Path) -> anyhow::Result<SqliteStore> {
    if !database.exists() {
        anyhow::bail!(
            "database {} not found (run `relmap init` first)",
            database.display()
        );
    }
    Ok(SqliteStore::open(database)?)
}
