//! # Relmap - Relational record mapper
//!
//! Persists application records into SQLite and reconstructs them on read,
//! following one-to-many and many-to-many relationships without any
//! hand-written SQL per record type.
//!
//! Relmap provides:
//! - Static per-type schema descriptors generated by the [`entity!`] macro
//! - A scalar codec between record fields and storage primitives
//! - Declared has-many relationships with a many-to-many default
//! - A traversal guard that stops cyclic relationship expansion
//! - A persistence engine over any [`storage::RowStore`] (SQLite by default)

pub mod naming;
pub mod codec;
pub mod schema;
pub mod record;
pub mod predicate;
pub mod relationship;
pub mod traversal;
pub mod storage;
pub mod engine;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use codec::{FieldValue, Scalar, Value};
pub use schema::{EntityType, FieldDef, FieldKind};
pub use record::{Entity, Record};
pub use predicate::Predicate;
pub use relationship::{HasManyHint, RelationshipKind, RelationshipRegistry};
pub use traversal::{ExpansionOutcome, ReadReport, TraversalPath};
pub use storage::{Row, RowStore, SqliteStore};
pub use engine::Persistence;

/// Result type alias for Relmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Relmap operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not construct a record of type {entity}")]
    Construction { entity: String },

    #[error("Cannot encode field {entity}.{field}: {reason}")]
    Encoding {
        entity: String,
        field: String,
        reason: String,
    },

    #[error("Unknown field {entity}.{field}")]
    UnknownField { entity: String, field: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn encoding(entity: &str, field: &str, reason: impl Into<String>) -> Self {
        Error::Encoding {
            entity: entity.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
