//! Per-table planning: table-level checks followed by per-column diffs.

use std::collections::HashSet;

use tracing::debug;

use crate::description::TableDescription;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::query::Query;
use crate::schema::Table;

/// Which columns of a table the current pass has already dealt with.
///
/// A fresh ledger is created for every table on every pass.
#[derive(Debug, Default)]
pub struct HandledColumns {
    columns: HashSet<String>,
    unique_indexes: HashSet<String>,
    added: HashSet<String>,
    rebuilt: bool,
}

impl HandledColumns {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the column's definition has been reconciled.
    #[must_use]
    pub fn is_handled(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Marks the column's definition as reconciled.
    pub fn mark_handled(&mut self, column: &str) {
        self.columns.insert(column.to_string());
    }

    /// Whether the column's unique index has been reconciled.
    #[must_use]
    pub fn is_unique_handled(&self, column: &str) -> bool {
        self.unique_indexes.contains(column)
    }

    /// Marks the column's unique index as reconciled.
    pub fn mark_unique_handled(&mut self, column: &str) {
        self.unique_indexes.insert(column.to_string());
    }

    /// Records that the column is added earlier in this pass.
    pub fn mark_added(&mut self, column: &str) {
        self.added.insert(column.to_string());
    }

    /// Whether the column is added earlier in this pass.
    #[must_use]
    pub fn was_added(&self, column: &str) -> bool {
        self.added.contains(column)
    }

    /// Whether the table has already been rebuilt in this pass.
    #[must_use]
    pub const fn is_rebuilt(&self) -> bool {
        self.rebuilt
    }

    /// Records a full rebuild, which reconciles every column of `table`.
    pub fn mark_rebuilt(&mut self, table: &Table) {
        self.rebuilt = true;
        for column in table.columns() {
            self.mark_handled(column.name());
            self.mark_unique_handled(column.name());
        }
    }
}

/// Generates the statements that bring `table` from `description` to its
/// declared shape.
///
/// A missing table is created first; columns follow in declaration order.
///
/// # Errors
///
/// Fails if a generated constraint or index name is invalid.
pub fn plan_table(
    dialect: Dialect,
    table: &Table,
    description: &TableDescription,
) -> Result<Vec<Query>> {
    let generator = dialect.generator();
    let mut handled = HandledColumns::new();
    let mut queries = Vec::new();

    if description.table_exists {
        queries.extend(generator.table_changes(table, description, &mut handled)?);
    } else {
        queries.push(generator.create_table(table)?);
    }

    for column in table.columns() {
        queries.extend(generator.generate(table, column, description, &mut handled)?);
    }

    debug!(
        table = %table.name(),
        dialect = %dialect,
        queries = queries.len(),
        "Planned table"
    );
    Ok(queries)
}
