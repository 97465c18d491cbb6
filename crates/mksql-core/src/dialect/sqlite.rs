//! SQLite generator.
//!
//! SQLite cannot modify a column in place. Any change to an existing
//! column, its foreign keys or the primary key name rebuilds the table:
//! create a temporary copy with the complete desired schema, copy the rows,
//! drop the original, rename the copy and recreate the unique indexes.

use crate::description::TableDescription;
use crate::error::Result;
use crate::plan::HandledColumns;
use crate::query::{Query, QueryKind};
use crate::schema::{Column, Table};

use super::types::is_integer_type;
use super::{Dialect, QueryGenerator, REBUILD_TABLE_SUFFIX};

/// Generator for SQLite 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGenerator;

impl SqliteGenerator {
    fn primary_key_definition(table: &Table) -> Result<String> {
        let constraint = Dialect::Sqlite.key_name(&format!("{}_pk", table.name()))?;
        let name = table.primary_key_name();
        Ok(if is_integer_type(Dialect::Sqlite, table.primary_key_type()) {
            format!("{name} integer constraint {constraint} primary key autoincrement")
        } else {
            format!(
                "{name} {} constraint {constraint} primary key",
                table.primary_key_type()
            )
        })
    }

    fn column_definition(&self, table: &Table, column: &Column) -> Result<String> {
        let mut sql = format!("{} {}", column.name(), column.sql_type());
        if let Some(default) = self.effective_default(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.quote_literal(&default));
        }
        sql.push_str(if column.not_null() { " NOT NULL" } else { " NULL" });
        for target in column.foreign_keys() {
            let name = Dialect::Sqlite.foreign_key_name(table.name(), column.name(), target)?;
            sql.push_str(&format!(
                " CONSTRAINT {name} REFERENCES {}({})",
                target.table, target.column
            ));
        }
        Ok(sql)
    }

    /// Whether `ALTER TABLE ... ADD` accepts the column.
    ///
    /// SQLite refuses NOT NULL columns without a default, and columns with
    /// both a foreign key and a non-NULL default.
    fn can_add(&self, column: &Column) -> bool {
        let default = self.effective_default(column);
        let null_violation = column.not_null() && default.is_none();
        let reference_violation = !column.foreign_keys().is_empty() && default.is_some();
        !null_violation && !reference_violation
    }

    fn create_unique_index(table: &Table, column: &Column, reason: String) -> Result<Query> {
        let name = Dialect::Sqlite.unique_index_name(table.name(), column.name())?;
        Ok(Query::column(
            table.name(),
            column.name(),
            QueryKind::CreateUniqueIndex,
            format!("CREATE UNIQUE INDEX {name} ON {} ({})", table.name(), column.name()),
            reason,
        ))
    }

    /// Emits the rebuild sequence once per pass and marks every column handled.
    fn rebuild(
        &self,
        table: &Table,
        trigger: Option<&str>,
        description: &TableDescription,
        handled: &mut HandledColumns,
        reason: &str,
    ) -> Result<Vec<Query>> {
        if handled.is_rebuilt() {
            return Ok(Vec::new());
        }
        let name = table.name();
        let tmp = Dialect::Sqlite.key_name(&format!("{name}_{REBUILD_TABLE_SUFFIX}"))?;

        let mut definitions = vec![Self::primary_key_definition(table)?];
        for column in table.columns() {
            definitions.push(self.column_definition(table, column)?);
        }

        let live_key = description
            .primary_key_name
            .as_deref()
            .unwrap_or_else(|| table.primary_key_name());
        let mut targets = vec![table.primary_key_name().to_string()];
        let mut sources = vec![live_key.to_string()];
        for column in table.columns() {
            if description.has_column(column.name()) || handled.was_added(column.name()) {
                targets.push(column.name().to_string());
                sources.push(column.name().to_string());
            }
        }

        let step = |kind: QueryKind, sql: String| {
            let reason = format!("rebuild: {reason}");
            match trigger {
                Some(column) => Query::column(name, column, kind, sql, reason),
                None => Query::table(name, kind, sql, reason),
            }
        };

        // Child rows referencing the table must survive the drop and rename.
        let mut queries = vec![
            step(
                QueryKind::DisableForeignKeys,
                "PRAGMA foreign_keys=OFF".to_string(),
            ),
            step(
                QueryKind::RebuildCreate,
                format!("CREATE TABLE {tmp} ({})", definitions.join(", ")),
            ),
            step(
                QueryKind::RebuildCopy,
                format!(
                    "INSERT INTO {tmp} ({}) SELECT {} FROM {name}",
                    targets.join(", "),
                    sources.join(", ")
                ),
            ),
            step(QueryKind::RebuildDrop, format!("DROP TABLE {name}")),
            step(
                QueryKind::RebuildRename,
                format!("ALTER TABLE {tmp} RENAME TO {name}"),
            ),
            step(
                QueryKind::EnableForeignKeys,
                "PRAGMA foreign_keys=ON".to_string(),
            ),
        ];
        for column in table.columns().iter().filter(|c| c.unique()) {
            queries.push(Self::create_unique_index(
                table,
                column,
                format!("rebuild: recreate unique index on {}", column.name()),
            )?);
        }

        handled.mark_rebuilt(table);
        Ok(queries)
    }
}

impl QueryGenerator for SqliteGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn supports_comments(&self) -> bool {
        false
    }

    /// Declared default, or `''` for NOT NULL columns without a foreign key.
    fn effective_default(&self, column: &Column) -> Option<String> {
        match column.default_value() {
            Some(value) => Some(value.literal()),
            None if column.not_null() && column.foreign_keys().is_empty() => Some(String::new()),
            None => None,
        }
    }

    fn create_table(&self, table: &Table) -> Result<Query> {
        Ok(Query::table(
            table.name(),
            QueryKind::CreateTable,
            format!(
                "CREATE TABLE {} ({})",
                table.name(),
                Self::primary_key_definition(table)?
            ),
            format!("table {} is missing", table.name()),
        ))
    }

    fn table_changes(
        &self,
        table: &Table,
        description: &TableDescription,
        handled: &mut HandledColumns,
    ) -> Result<Vec<Query>> {
        match description.primary_key_name.as_deref() {
            Some(live_key) if live_key != table.primary_key_name() => self.rebuild(
                table,
                None,
                description,
                handled,
                &format!(
                    "primary key renamed from {live_key} to {}",
                    table.primary_key_name()
                ),
            ),
            _ => Ok(Vec::new()),
        }
    }

    fn generate(
        &self,
        table: &Table,
        column: &Column,
        description: &TableDescription,
        handled: &mut HandledColumns,
    ) -> Result<Vec<Query>> {
        if handled.is_rebuilt() {
            return Ok(Vec::new());
        }
        let mut queries = Vec::new();
        let live = description.column(column.name());

        if !handled.is_handled(column.name()) {
            match live {
                None if self.can_add(column) => {
                    queries.push(Query::column(
                        table.name(),
                        column.name(),
                        QueryKind::AddColumn,
                        format!(
                            "ALTER TABLE {} ADD {}",
                            table.name(),
                            self.column_definition(table, column)?
                        ),
                        format!("column {} is missing", column.name()),
                    ));
                    handled.mark_added(column.name());
                }
                None => {
                    return self.rebuild(
                        table,
                        Some(column.name()),
                        description,
                        handled,
                        &format!("column {} cannot be added in place", column.name()),
                    );
                }
                Some(live) => {
                    let mut reasons = self.change_reasons(column, live);
                    let desired: Vec<String> =
                        column.foreign_keys().iter().map(ToString::to_string).collect();
                    if desired.len() != live.foreign_keys.len()
                        || desired.iter().any(|d| !live.foreign_keys.contains_key(d))
                    {
                        reasons.push("foreign keys changed".to_string());
                    }
                    if !reasons.is_empty() {
                        return self.rebuild(
                            table,
                            Some(column.name()),
                            description,
                            handled,
                            &reasons.join("; "),
                        );
                    }
                }
            }
            handled.mark_handled(column.name());
        }

        if !handled.is_unique_handled(column.name()) {
            let existing = live.and_then(|l| l.unique_index.as_deref());
            match (column.unique(), existing) {
                (true, None) => queries.push(Self::create_unique_index(
                    table,
                    column,
                    format!("unique index on {} is missing", column.name()),
                )?),
                (false, Some(index)) => queries.push(Query::column(
                    table.name(),
                    column.name(),
                    QueryKind::DropUniqueIndex,
                    format!("DROP INDEX {index}"),
                    format!("column {} is no longer unique", column.name()),
                )),
                _ => {}
            }
            handled.mark_unique_handled(column.name());
        }
        Ok(queries)
    }
}
