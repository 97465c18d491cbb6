//! Snapshots of the live schema.
//!
//! A [`TableDescription`] is read fresh from the database at the start of
//! every pass and thrown away once the table has been diffed.

use std::collections::BTreeMap;

use serde::Serialize;

/// Live state of one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    /// Whether the column exists.
    pub column_exists: bool,
    /// Column type as reported by the database.
    pub sql_type: String,
    /// Whether the column rejects NULL.
    pub not_null: bool,
    /// Unquoted default literal, `None` when absent or `NULL`.
    pub default: Option<String>,
    /// Column comment (always `None` on SQLite).
    pub comment: Option<String>,
    /// Name of the unique index covering exactly this column.
    pub unique_index: Option<String>,
    /// Foreign keys, keyed by `table.column` target, valued by constraint name.
    pub foreign_keys: BTreeMap<String, String>,
}

impl ColumnDescription {
    /// Description of a column that does not exist.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Live state of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDescription {
    /// Whether the table exists.
    pub table_exists: bool,
    /// Name of the primary key column, if one was found.
    pub primary_key_name: Option<String>,
    /// Table comment (MySQL only).
    pub comment: Option<String>,
    /// Descriptions of the desired columns, keyed by column name.
    pub columns: BTreeMap<String, ColumnDescription>,
}

impl TableDescription {
    /// Description of a table that does not exist.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Looks up a column, returning `None` when it was not found live.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.get(name).filter(|c| c.column_exists)
    }

    /// Returns whether the column exists live.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}
