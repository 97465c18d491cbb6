//! Error types for schema declaration and query generation.

/// Errors raised while declaring a schema or generating DDL for it.
///
/// Every variant except the internal ones is a caller mistake detected
/// before any SQL reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// An identifier contains characters outside `[A-Za-z0-9_]`.
    #[error("Invalid identifier '{0}': only [A-Za-z0-9_] is allowed")]
    InvalidIdentifier(String),

    /// A column type contains forbidden characters.
    #[error("Invalid column type '{0}'")]
    InvalidType(String),

    /// A comment contains a keyword the live-schema readers rely on.
    #[error("Invalid comment '{text}': must not contain '{keyword}'")]
    InvalidComment {
        /// The rejected comment.
        text: String,
        /// The keyword that was found.
        keyword: &'static str,
    },

    /// A default value contains a keyword the live-schema readers rely on.
    #[error("Invalid default value '{text}': must not contain '{keyword}'")]
    InvalidDefault {
        /// The rejected default value.
        text: String,
        /// The keyword that was found.
        keyword: &'static str,
    },

    /// A foreign-key target is not of the form `table.column`.
    #[error("Invalid foreign key target '{0}': expected 'table.column'")]
    InvalidForeignKeyTarget(String),

    /// A table with this name is already registered.
    #[error("Table '{0}' is already registered")]
    DuplicateTable(String),

    /// A column with this name already exists on the table.
    #[error("Column '{column}' already exists on table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column uses the name of the table's primary key.
    #[error("Column '{column}' collides with the primary key of table '{table}'")]
    PrimaryKeyCollision {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column is already owned by a table and must be cloned to be reused.
    #[error("Column '{column}' already belongs to table '{owner}'; clone it to reuse the definition")]
    ColumnAlreadyOwned {
        /// Column name.
        column: String,
        /// Name of the owning table.
        owner: String,
    },

    /// A table that is not registered was looked up.
    #[error("Table '{0}' is not registered")]
    UnknownTable(String),

    /// A column that is not declared was looked up.
    #[error("Column '{column}' is not declared on table '{table}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A foreign key points at a table or column that is not registered.
    #[error("Foreign key {table}.{column} -> {target} references {missing}, which is not registered")]
    DanglingForeignKey {
        /// Table declaring the foreign key.
        table: String,
        /// Column declaring the foreign key.
        column: String,
        /// The `table.column` target.
        target: String,
        /// Description of what is missing (`table 'x'` or `column 'x.y'`).
        missing: String,
    },

    /// Internal: dependency ordering recursed past its depth guard.
    #[error("Internal error: dependency ordering exceeded depth {depth} at table '{table}' (foreign key cycle?)")]
    DependencyDepthExceeded {
        /// Table being visited when the guard tripped.
        table: String,
        /// The depth limit.
        depth: usize,
    },

    /// Internal: the dependency ordering produced a table the registry does not know.
    #[error("Internal error: ordering produced table '{0}' which is not registered")]
    OrderedTableMissing(String),
}

impl SchemaError {
    /// Returns `true` for errors that indicate a bug rather than a caller mistake.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::DependencyDepthExceeded { .. } | Self::OrderedTableMissing(_)
        )
    }

    /// Returns `true` for foreign keys that point at unregistered tables or columns.
    #[must_use]
    pub const fn is_referential(&self) -> bool {
        matches!(self, Self::DanglingForeignKey { .. })
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
