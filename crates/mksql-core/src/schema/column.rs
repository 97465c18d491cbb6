//! Desired-state column definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::validate::{
    validate_comment, validate_default, validate_foreign_key_target, validate_identifier,
    validate_type,
};

/// Type used when a column is declared without one.
pub const DEFAULT_COLUMN_TYPE: &str = "int";

/// Scalar default value of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Boolean default, rendered as `1`/`0`.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Floating point default.
    Float(f64),
    /// Text default.
    Text(String),
}

impl DefaultValue {
    /// Returns the unquoted literal text, as the live schema reports it.
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A validated `table.column` foreign-key target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForeignKeyTarget {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
}

impl ForeignKeyTarget {
    /// Parses and validates a `table.column` string.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidForeignKeyTarget`] for malformed targets.
    pub fn parse(target: &str) -> Result<Self> {
        let (table, column) = validate_foreign_key_target(target)?;
        Ok(Self {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

impl fmt::Display for ForeignKeyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Desired definition of a single column.
///
/// A column belongs to at most one table. Cloning produces an unowned copy,
/// which is how one definition is reused across tables.
#[derive(Debug, PartialEq)]
pub struct Column {
    name: String,
    sql_type: String,
    not_null: bool,
    unique: bool,
    default: Option<DefaultValue>,
    comment: Option<String>,
    foreign_keys: Vec<ForeignKeyTarget>,
    owner: Option<String>,
}

impl Clone for Column {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sql_type: self.sql_type.clone(),
            not_null: self.not_null,
            unique: self.unique,
            default: self.default.clone(),
            comment: self.comment.clone(),
            foreign_keys: self.foreign_keys.clone(),
            owner: None,
        }
    }
}

impl Column {
    /// Creates an unowned, nullable column.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or the type fails validation.
    pub fn new(name: &str, sql_type: &str) -> Result<Self> {
        Ok(Self {
            name: validate_identifier(name)?.to_string(),
            sql_type: validate_type(sql_type)?,
            not_null: false,
            unique: false,
            default: None,
            comment: None,
            foreign_keys: Vec::new(),
            owner: None,
        })
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized column type.
    #[must_use]
    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    /// Whether the column rejects NULL.
    #[must_use]
    pub const fn not_null(&self) -> bool {
        self.not_null
    }

    /// Whether the column carries a unique index.
    #[must_use]
    pub const fn unique(&self) -> bool {
        self.unique
    }

    /// Declared default value.
    #[must_use]
    pub const fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Declared comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Declared foreign-key targets, in declaration order.
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKeyTarget] {
        &self.foreign_keys
    }

    /// Name of the owning table, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Changes the column type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] if the type fails validation.
    pub fn set_type(&mut self, sql_type: &str) -> Result<&mut Self> {
        self.sql_type = validate_type(sql_type)?;
        Ok(self)
    }

    /// Sets NOT NULL. Clearing it also clears `unique`.
    pub fn set_not_null(&mut self, not_null: bool) -> &mut Self {
        self.not_null = not_null;
        if !not_null {
            self.unique = false;
        }
        self
    }

    /// Sets the unique flag. A unique column is always NOT NULL.
    pub fn set_unique(&mut self, unique: bool) -> &mut Self {
        self.unique = unique;
        if unique {
            self.not_null = true;
        }
        self
    }

    /// Sets or clears the default value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDefault`] if the literal contains a reserved keyword.
    pub fn set_default(&mut self, default: Option<DefaultValue>) -> Result<&mut Self> {
        if let Some(value) = &default {
            validate_default(&value.literal())?;
        }
        self.default = default;
        Ok(self)
    }

    /// Sets or clears the comment.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidComment`] if the text contains a reserved keyword.
    pub fn set_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        self.comment = validate_comment(comment)?;
        Ok(self)
    }

    /// Declares a foreign key in deferred mode.
    ///
    /// Only the `table.column` format is checked here; whether the target is
    /// registered is resolved at the start of the next reconciliation pass.
    /// Declaring the same target twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidForeignKeyTarget`] for malformed targets.
    pub fn add_foreign_key(&mut self, target: &str) -> Result<&mut Self> {
        let target = ForeignKeyTarget::parse(target)?;
        if !self.foreign_keys.contains(&target) {
            self.foreign_keys.push(target);
        }
        Ok(self)
    }

    /// Removes a foreign key. Returns whether it was declared.
    pub fn remove_foreign_key(&mut self, target: &str) -> bool {
        let before = self.foreign_keys.len();
        self.foreign_keys.retain(|fk| fk.to_string() != target);
        before != self.foreign_keys.len()
    }

    pub(crate) fn set_owner(&mut self, table: &str) -> Result<()> {
        if let Some(owner) = &self.owner {
            return Err(SchemaError::ColumnAlreadyOwned {
                column: self.name.clone(),
                owner: owner.clone(),
            });
        }
        self.owner = Some(table.to_string());
        Ok(())
    }

    /// Re-attaches a cloned column to the clone of its table.
    pub(crate) fn adopt(&mut self, table: &str) {
        self.owner = Some(table.to_string());
    }

    /// Rewrites `table.old_key` targets to `table.new_key`, keeping the list free of duplicates.
    pub(crate) fn rename_foreign_key_column(&mut self, table: &str, old_key: &str, new_key: &str) {
        let mut rewritten: Vec<ForeignKeyTarget> = Vec::with_capacity(self.foreign_keys.len());
        for mut fk in self.foreign_keys.drain(..) {
            if fk.table == table && fk.column == old_key {
                fk.column = new_key.to_string();
            }
            if !rewritten.contains(&fk) {
                rewritten.push(fk);
            }
        }
        self.foreign_keys = rewritten;
    }

    /// Canonical text used for structural hashing.
    pub(crate) fn fingerprint(&self) -> String {
        let fks: Vec<String> = self.foreign_keys.iter().map(ToString::to_string).collect();
        format!(
            "{}|{}|{}|{}|{:?}|{:?}|{}",
            self.name,
            self.sql_type,
            self.not_null,
            self.unique,
            self.default.as_ref().map(DefaultValue::literal),
            self.comment,
            fks.join(",")
        )
    }
}
