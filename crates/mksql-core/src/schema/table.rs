//! Desired-state table definitions.

use sha2::{Digest, Sha256};

use crate::error::{Result, SchemaError};
use crate::validate::{validate_comment, validate_identifier, validate_type};

use super::column::Column;

/// Primary key column name used when none is configured.
pub const DEFAULT_PRIMARY_KEY_NAME: &str = "id";

/// Primary key type used when none is configured.
pub const DEFAULT_PRIMARY_KEY_TYPE: &str = "int";

/// Desired definition of a table.
///
/// The primary key is described by name and type only; it is never an
/// ordinary [`Column`]. Columns keep their insertion order so that generated
/// DDL is stable from one run to the next.
#[derive(Debug, PartialEq)]
pub struct Table {
    name: String,
    primary_key_name: String,
    primary_key_type: String,
    comment: Option<String>,
    columns: Vec<Column>,
}

impl Clone for Table {
    fn clone(&self) -> Self {
        let mut columns = self.columns.clone();
        for column in &mut columns {
            column.adopt(&self.name);
        }
        Self {
            name: self.name.clone(),
            primary_key_name: self.primary_key_name.clone(),
            primary_key_type: self.primary_key_type.clone(),
            comment: self.comment.clone(),
            columns,
        }
    }
}

impl Table {
    /// Creates an empty table with the default `id int` primary key.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidIdentifier`] if the name is invalid.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: validate_identifier(name)?.to_string(),
            primary_key_name: DEFAULT_PRIMARY_KEY_NAME.to_string(),
            primary_key_type: DEFAULT_PRIMARY_KEY_TYPE.to_string(),
            comment: None,
            columns: Vec::new(),
        })
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key column name.
    #[must_use]
    pub fn primary_key_name(&self) -> &str {
        &self.primary_key_name
    }

    /// Primary key column type.
    #[must_use]
    pub fn primary_key_type(&self) -> &str {
        &self.primary_key_type
    }

    /// Table comment (MySQL only).
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Looks up a column by name for modification.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name() == name)
    }

    /// Returns whether `name` is the primary key or a declared column.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.primary_key_name == name || self.column(name).is_some()
    }

    /// Declares a new column and returns it for further configuration.
    ///
    /// # Errors
    ///
    /// Fails on invalid names or types, on a duplicate column name and when
    /// the name is the primary key's.
    pub fn create_column(&mut self, name: &str, sql_type: &str) -> Result<&mut Column> {
        let column = Column::new(name, sql_type)?;
        self.add_column(column)
    }

    /// Adds a pre-built column and takes ownership of it.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate column name, a primary key collision, or when the
    /// column already belongs to a table (clone it first).
    pub fn add_column(&mut self, mut column: Column) -> Result<&mut Column> {
        if column.name() == self.primary_key_name {
            return Err(SchemaError::PrimaryKeyCollision {
                table: self.name.clone(),
                column: column.name().to_string(),
            });
        }
        if self.column(column.name()).is_some() {
            return Err(SchemaError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name().to_string(),
            });
        }
        column.set_owner(&self.name)?;
        self.columns.push(column);
        let last = self.columns.len() - 1;
        Ok(&mut self.columns[last])
    }

    /// Renames the primary key column of a table that is not registered.
    ///
    /// Registered tables must go through
    /// [`TableHandle::set_primary_key_name`](super::TableHandle::set_primary_key_name)
    /// so that foreign keys elsewhere follow the rename.
    ///
    /// # Errors
    ///
    /// Fails on invalid names and when a column already uses the name.
    pub fn set_primary_key_name(&mut self, name: &str) -> Result<&mut Self> {
        validate_identifier(name)?;
        if self.column(name).is_some() {
            return Err(SchemaError::PrimaryKeyCollision {
                table: self.name.clone(),
                column: name.to_string(),
            });
        }
        self.primary_key_name = name.to_string();
        Ok(self)
    }

    /// Changes the primary key column type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] if the type fails validation.
    pub fn set_primary_key_type(&mut self, sql_type: &str) -> Result<&mut Self> {
        self.primary_key_type = validate_type(sql_type)?;
        Ok(self)
    }

    /// Sets or clears the table comment.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidComment`] if the text contains a reserved keyword.
    pub fn set_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        self.comment = validate_comment(comment)?;
        Ok(self)
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.iter_mut()
    }

    /// SHA-256 over a canonical rendering of the whole table definition.
    ///
    /// Two tables hash equal exactly when they would generate the same DDL.
    #[must_use]
    pub fn structural_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.primary_key_name.as_bytes());
        hasher.update(b" ");
        hasher.update(self.primary_key_type.as_bytes());
        hasher.update(b"\n");
        hasher.update(format!("{:?}", self.comment).as_bytes());
        for column in &self.columns {
            hasher.update(b"\n");
            hasher.update(column.fingerprint().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_defaults() {
        let table = Table::new("accounts").unwrap();
        assert_eq!(table.primary_key_name(), "id");
        assert_eq!(table.primary_key_type(), "int");
        assert!(table.columns().is_empty());
        assert!(Table::new("bad name").is_err());
    }

    #[test]
    fn test_create_column_rejects_duplicates_and_primary_key() {
        let mut table = Table::new("accounts").unwrap();
        table.create_column("login", "varchar(60)").unwrap();

        assert!(matches!(
            table.create_column("login", "int"),
            Err(SchemaError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            table.create_column("id", "int"),
            Err(SchemaError::PrimaryKeyCollision { .. })
        ));
        assert!(table.create_column("bad.name", "int").is_err());
        assert_eq!(table.columns().len(), 1);
    }

    #[test]
    fn test_add_column_requires_unowned_column() {
        let mut posts = Table::new("posts").unwrap();
        let mut comments = Table::new("comments").unwrap();

        let created = posts.create_column("created", "datetime").unwrap().clone();
        let owned = posts.column("created").unwrap();
        assert_eq!(owned.owner(), Some("posts"));

        let template = created.clone();
        comments.add_column(template).unwrap();
        assert_eq!(comments.column("created").unwrap().owner(), Some("comments"));

        let mut reowned = Column::new("x", "int").unwrap();
        reowned.set_owner("posts").unwrap();
        assert!(matches!(
            comments.add_column(reowned),
            Err(SchemaError::ColumnAlreadyOwned { .. })
        ));
    }

    #[test]
    fn test_primary_key_rename_collision() {
        let mut table = Table::new("accounts").unwrap();
        table.create_column("uid", "int").unwrap();
        assert!(matches!(
            table.set_primary_key_name("uid"),
            Err(SchemaError::PrimaryKeyCollision { .. })
        ));
        table.set_primary_key_name("account_id").unwrap();
        assert_eq!(table.primary_key_name(), "account_id");
    }

    #[test]
    fn test_structural_hash_tracks_changes() {
        let mut table = Table::new("accounts").unwrap();
        table.create_column("login", "varchar(60)").unwrap();
        let before = table.structural_hash();
        assert_eq!(before, table.clone().structural_hash());

        table.column_mut("login").unwrap().set_unique(true);
        assert_ne!(before, table.structural_hash());
    }
}
