//! Error types for schema synchronization.

use std::path::PathBuf;

use schemasync_core::TagError;

/// Errors that can occur while loading, diffing or applying schemas.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A column or index option string could not be parsed.
    #[error("Invalid options for {location}: {source}")]
    Tag {
        /// Table, column or index carrying the options.
        location: String,
        /// The parse failure.
        #[source]
        source: TagError,
    },

    /// The same table was declared twice.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// Failed to read or parse a schema file.
    #[error("Failed to parse schema file '{path}': {message}")]
    ParseError {
        /// Path to the schema file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The connection has no default database to introspect.
    #[error("No database selected; the connection URL must name a database")]
    NoDatabaseSelected,

    /// A catalog query failed.
    #[error("Introspection failed while {context}: {source}")]
    Introspection {
        /// What was being read.
        context: &'static str,
        /// The underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// A statement failed; the batch was rolled back.
    #[error("Statement {position} failed, batch rolled back: {statement}: {source}")]
    Apply {
        /// 1-based position of the failing statement in the batch.
        position: usize,
        /// The statement that failed.
        statement: String,
        /// The underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// Database error outside of statement execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
