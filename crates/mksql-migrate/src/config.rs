//! JSON schema files.
//!
//! A schema file declares tables the same way the programmatic API does:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "accounts",
//!       "comment": "registered users",
//!       "columns": [
//!         { "name": "login", "type": "varchar(60)", "unique": true },
//!         { "name": "role", "type": "varchar(20)", "default": "guest" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Foreign keys are applied in deferred mode, so tables may appear in any
//! order; references are checked when a pass starts.

use std::fs;
use std::path::Path;

use mksql_core::schema::DEFAULT_COLUMN_TYPE;
use mksql_core::{DefaultValue, SchemaRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Top level of a schema file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Declared tables, in registration order.
    pub tables: Vec<TableSpec>,
}

/// One table in a schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Primary key name, `id` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_name: Option<String>,
    /// Primary key type, `int` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_type: Option<String>,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Columns, in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

/// One column in a schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// SQL type.
    #[serde(rename = "type", default = "default_column_type")]
    pub sql_type: String,
    /// NOT NULL flag.
    #[serde(default)]
    pub not_null: bool,
    /// Unique flag; implies NOT NULL.
    #[serde(default)]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Foreign-key targets as `table.column`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<String>,
}

fn default_column_type() -> String {
    DEFAULT_COLUMN_TYPE.to_string()
}

impl SchemaFile {
    /// Parses a schema file from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Serialization`](crate::error::MigrateError::Serialization)
    /// on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a schema file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let file = Self::from_json(&text)?;
        debug!(path = %path.display(), tables = file.tables.len(), "Loaded schema file");
        Ok(file)
    }

    /// Declares every table of the file in `registry`.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, e.g. an invalid identifier or a
    /// duplicate table.
    pub fn apply(&self, registry: &mut SchemaRegistry) -> Result<()> {
        for spec in &self.tables {
            let mut table = registry.register_table(&spec.name)?;
            if let Some(name) = &spec.primary_key_name {
                table.set_primary_key_name(name)?;
            }
            if let Some(sql_type) = &spec.primary_key_type {
                table.set_primary_key_type(sql_type)?;
            }
            table.set_comment(spec.comment.as_deref())?;

            for column_spec in &spec.columns {
                let column = table.create_column(&column_spec.name, &column_spec.sql_type)?;
                column
                    .set_not_null(column_spec.not_null)
                    .set_unique(column_spec.unique)
                    .set_default(column_spec.default.clone())?
                    .set_comment(column_spec.comment.as_deref())?;
                for target in &column_spec.foreign_keys {
                    column.add_foreign_key(target)?;
                }
            }
        }
        Ok(())
    }

    /// Builds a fresh registry from the file.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn to_registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        self.apply(&mut registry)?;
        Ok(registry)
    }
}
