//! Registry of desired tables.

use tracing::debug;

use crate::error::{Result, SchemaError};

use super::column::{Column, ForeignKeyTarget};
use super::table::Table;

/// How a foreign key declared through a [`TableHandle`] is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyMode {
    /// The target table and column must already be registered.
    Strict,
    /// Only the format is checked now; the target is resolved when the
    /// registry is validated at the start of a reconciliation pass.
    #[default]
    Deferred,
}

/// All desired tables, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: Vec<Table>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new empty table and returns a handle to declare its columns.
    ///
    /// # Errors
    ///
    /// Fails on an invalid name or when the table is already registered.
    pub fn register_table(&mut self, name: &str) -> Result<TableHandle<'_>> {
        let table = Table::new(name)?;
        self.add_table(table)
    }

    /// Registers a table that was built detached.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateTable`] if the name is taken.
    pub fn add_table(&mut self, table: Table) -> Result<TableHandle<'_>> {
        if self.table(table.name()).is_some() {
            return Err(SchemaError::DuplicateTable(table.name().to_string()));
        }
        debug!(table = %table.name(), "Registering table");
        self.tables.push(table);
        let index = self.tables.len() - 1;
        Ok(TableHandle {
            registry: self,
            index,
        })
    }

    /// Returns a handle to modify a registered table.
    pub fn table_mut(&mut self, name: &str) -> Option<TableHandle<'_>> {
        let index = self.tables.iter().position(|t| t.name() == name)?;
        Some(TableHandle {
            registry: self,
            index,
        })
    }

    /// Looks up a registered table.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Registered tables in registration order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` when no table is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Primary key name of a registered table.
    #[must_use]
    pub fn primary_key_of(&self, table: &str) -> Option<&str> {
        self.table(table).map(Table::primary_key_name)
    }

    /// Checks that a foreign-key target names a registered table and one of
    /// its fields (primary key or declared column).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DanglingForeignKey`] naming what is missing.
    pub fn check_target(&self, table: &str, column: &str, target: &ForeignKeyTarget) -> Result<()> {
        let dangling = |missing: String| SchemaError::DanglingForeignKey {
            table: table.to_string(),
            column: column.to_string(),
            target: target.to_string(),
            missing,
        };
        let Some(referenced) = self.table(&target.table) else {
            return Err(dangling(format!("table '{}'", target.table)));
        };
        if !referenced.has_field(&target.column) {
            return Err(dangling(format!("column '{target}'")));
        }
        Ok(())
    }

    /// Resolves every declared foreign key against the registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError::DanglingForeignKey`] found.
    pub fn validate_references(&self) -> Result<()> {
        for table in &self.tables {
            for column in table.columns() {
                for target in column.foreign_keys() {
                    self.check_target(table.name(), column.name(), target)?;
                }
            }
        }
        Ok(())
    }

    fn cascade_primary_key_rename(&mut self, table: &str, old_key: &str, new_key: &str) {
        for other in &mut self.tables {
            for column in other.columns_mut() {
                column.rename_foreign_key_column(table, old_key, new_key);
            }
        }
    }
}

/// Mutable access to one registered table.
///
/// Going through the handle keeps cross-table invariants intact: renaming a
/// primary key rewrites the foreign keys that point at it, and strict
/// foreign keys are checked against the rest of the registry.
#[derive(Debug)]
pub struct TableHandle<'a> {
    registry: &'a mut SchemaRegistry,
    index: usize,
}

impl TableHandle<'_> {
    fn inner(&mut self) -> &mut Table {
        &mut self.registry.tables[self.index]
    }

    /// The table behind this handle.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.registry.tables[self.index]
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.table().name()
    }

    /// Declares a new column.
    ///
    /// # Errors
    ///
    /// See [`Table::create_column`].
    pub fn create_column(&mut self, name: &str, sql_type: &str) -> Result<&mut Column> {
        self.inner().create_column(name, sql_type)
    }

    /// Adds a pre-built, unowned column.
    ///
    /// # Errors
    ///
    /// See [`Table::add_column`].
    pub fn add_column(&mut self, column: Column) -> Result<&mut Column> {
        self.inner().add_column(column)
    }

    /// Looks up a declared column for modification.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.inner().column_mut(name)
    }

    /// Declares a foreign key on one of this table's columns.
    ///
    /// # Errors
    ///
    /// Fails on a malformed target or an unknown column; in
    /// [`ForeignKeyMode::Strict`] also when the target is not registered.
    pub fn add_foreign_key(
        &mut self,
        column: &str,
        target: &str,
        mode: ForeignKeyMode,
    ) -> Result<&mut Self> {
        let parsed = ForeignKeyTarget::parse(target)?;
        let table_name = self.name().to_string();
        if self.table().column(column).is_none() {
            return Err(SchemaError::UnknownColumn {
                table: table_name,
                column: column.to_string(),
            });
        }
        if mode == ForeignKeyMode::Strict {
            self.registry.check_target(&table_name, column, &parsed)?;
        }
        if let Some(col) = self.inner().column_mut(column) {
            col.add_foreign_key(target)?;
        }
        Ok(self)
    }

    /// Renames the primary key and rewrites every foreign key that pointed at
    /// the old name, across all registered tables.
    ///
    /// # Errors
    ///
    /// Fails on invalid names and when a column already uses the name.
    pub fn set_primary_key_name(&mut self, name: &str) -> Result<&mut Self> {
        let old_key = self.table().primary_key_name().to_string();
        self.inner().set_primary_key_name(name)?;
        if old_key != name {
            let table_name = self.name().to_string();
            debug!(table = %table_name, old = %old_key, new = %name, "Renaming primary key");
            self.registry
                .cascade_primary_key_rename(&table_name, &old_key, name);
        }
        Ok(self)
    }

    /// Changes the primary key type. Foreign-key targets are name-based and
    /// are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] if the type fails validation.
    pub fn set_primary_key_type(&mut self, sql_type: &str) -> Result<&mut Self> {
        self.inner().set_primary_key_type(sql_type)?;
        Ok(self)
    }

    /// Sets or clears the table comment.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidComment`] if the text contains a reserved keyword.
    pub fn set_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        self.inner().set_comment(comment)?;
        Ok(self)
    }
}
