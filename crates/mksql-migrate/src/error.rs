//! Error types for reconciliation runs.

use mksql_core::SchemaError;

/// Errors that can occur while reconciling a schema.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The declared schema is invalid.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Database error while connecting or describing a table.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A generated statement failed. The rest of the queue was not run.
    #[error("Failed to reconcile {table}{}: {source}\n  SQL: {sql}", .column.as_ref().map(|c| format!(".{c}")).unwrap_or_default())]
    Execution {
        /// Table the statement belonged to.
        table: String,
        /// Column the statement was generated for, if any.
        column: Option<String>,
        /// The statement that failed.
        sql: String,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Reconciliation was started from inside a declaration scope.
    #[error("Reconciliation cannot run while the schema is being declared")]
    ReentrantReconcile,

    /// The connection URL names an engine that is not supported.
    #[error("Unsupported database URL '{0}': expected a sqlite: or mysql: URL")]
    UnsupportedDatabaseUrl(String),

    /// IO error (reading schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Returns `true` for mistakes in the calling code rather than in data
    /// or in the database.
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::ReentrantReconcile)
            || matches!(self, Self::Schema(e) if e.is_internal())
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
