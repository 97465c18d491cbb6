//! MySQL generator.
//!
//! Columns are changed in place with `ALTER TABLE ... MODIFY`. Foreign keys
//! and unique indexes are separate statements around it.

use crate::description::{ColumnDescription, TableDescription};
use crate::error::Result;
use crate::plan::HandledColumns;
use crate::query::{Query, QueryKind};
use crate::schema::{Column, ForeignKeyTarget, Table};

use super::types::is_integer_type;
use super::{Dialect, QueryGenerator};

/// Generator for MySQL and MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGenerator;

impl MySqlGenerator {
    fn column_definition(&self, column: &Column) -> String {
        let mut sql = format!("{} {}", column.name(), column.sql_type());
        if let Some(default) = self.effective_default(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.quote_literal(&default));
        }
        sql.push_str(if column.not_null() { " NOT NULL" } else { " NULL" });
        if let Some(comment) = column.comment() {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.quote_literal(comment));
        }
        sql
    }

    fn primary_key_definition(table: &Table, name: &str) -> String {
        let mut sql = format!("{name} {} NOT NULL", table.primary_key_type());
        if is_integer_type(Dialect::MySql, table.primary_key_type()) {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    fn create_foreign_key(table: &Table, column: &Column, target: &ForeignKeyTarget) -> Result<Query> {
        let name = Dialect::MySql.foreign_key_name(table.name(), column.name(), target)?;
        Ok(Query::column(
            table.name(),
            column.name(),
            QueryKind::CreateForeignKey,
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {name} FOREIGN KEY({}) REFERENCES {}({})",
                table.name(),
                column.name(),
                target.table,
                target.column
            ),
            format!("foreign key to {target} is missing"),
        ))
    }

    fn reconcile_unique(
        table: &Table,
        column: &Column,
        live: Option<&ColumnDescription>,
    ) -> Result<Option<Query>> {
        let existing = live.and_then(|l| l.unique_index.as_deref());
        match (column.unique(), existing) {
            (true, None) => {
                let name = Dialect::MySql.unique_index_name(table.name(), column.name())?;
                Ok(Some(Query::column(
                    table.name(),
                    column.name(),
                    QueryKind::CreateUniqueIndex,
                    format!("CREATE UNIQUE INDEX {name} ON {}({})", table.name(), column.name()),
                    format!("unique index on {} is missing", column.name()),
                )))
            }
            (false, Some(name)) => Ok(Some(Query::column(
                table.name(),
                column.name(),
                QueryKind::DropUniqueIndex,
                format!("DROP INDEX {name} ON {}", table.name()),
                format!("column {} is no longer unique", column.name()),
            ))),
            _ => Ok(None),
        }
    }
}

impl QueryGenerator for MySqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn supports_comments(&self) -> bool {
        true
    }

    fn effective_default(&self, column: &Column) -> Option<String> {
        column.default_value().map(|d| d.literal())
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn create_table(&self, table: &Table) -> Result<Query> {
        let mut sql = format!(
            "CREATE TABLE {} ({} PRIMARY KEY)",
            table.name(),
            Self::primary_key_definition(table, table.primary_key_name())
        );
        if let Some(comment) = table.comment() {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.quote_literal(comment));
        }
        Ok(Query::table(
            table.name(),
            QueryKind::CreateTable,
            sql,
            format!("table {} is missing", table.name()),
        ))
    }

    fn table_changes(
        &self,
        table: &Table,
        description: &TableDescription,
        _handled: &mut HandledColumns,
    ) -> Result<Vec<Query>> {
        let mut queries = Vec::new();
        if let Some(live_key) = description.primary_key_name.as_deref() {
            if live_key != table.primary_key_name() {
                queries.push(Query::table(
                    table.name(),
                    QueryKind::RenamePrimaryKey,
                    format!(
                        "ALTER TABLE {} CHANGE {live_key} {}",
                        table.name(),
                        Self::primary_key_definition(table, table.primary_key_name())
                    ),
                    format!(
                        "primary key renamed from {live_key} to {}",
                        table.primary_key_name()
                    ),
                ));
            }
        }
        if table.comment() != description.comment.as_deref() {
            queries.push(Query::table(
                table.name(),
                QueryKind::AlterTableComment,
                format!(
                    "ALTER TABLE {} COMMENT {}",
                    table.name(),
                    self.quote_literal(table.comment().unwrap_or_default())
                ),
                "table comment changed",
            ));
        }
        Ok(queries)
    }

    fn generate(
        &self,
        table: &Table,
        column: &Column,
        description: &TableDescription,
        handled: &mut HandledColumns,
    ) -> Result<Vec<Query>> {
        let mut queries = Vec::new();
        let live = description.column(column.name());

        if !handled.is_handled(column.name()) {
            if let Some(live) = live {
                for (target, name) in &live.foreign_keys {
                    if !column.foreign_keys().iter().any(|fk| fk.to_string() == *target) {
                        queries.push(Query::column(
                            table.name(),
                            column.name(),
                            QueryKind::DropForeignKey,
                            format!("ALTER TABLE {} DROP FOREIGN KEY {name}", table.name()),
                            format!("foreign key {name} to {target} is no longer declared"),
                        ));
                    }
                }
                let reasons = self.change_reasons(column, live);
                if !reasons.is_empty() {
                    queries.push(Query::column(
                        table.name(),
                        column.name(),
                        QueryKind::AlterColumn,
                        format!(
                            "ALTER TABLE {} MODIFY {}",
                            table.name(),
                            self.column_definition(column)
                        ),
                        reasons.join("; "),
                    ));
                }
            } else {
                queries.push(Query::column(
                    table.name(),
                    column.name(),
                    QueryKind::AddColumn,
                    format!(
                        "ALTER TABLE {} ADD {}",
                        table.name(),
                        self.column_definition(column)
                    ),
                    format!("column {} is missing", column.name()),
                ));
                handled.mark_added(column.name());
            }
            for target in column.foreign_keys() {
                let exists = live.is_some_and(|l| l.foreign_keys.contains_key(&target.to_string()));
                if !exists {
                    queries.push(Self::create_foreign_key(table, column, target)?);
                }
            }
            handled.mark_handled(column.name());
        }

        if !handled.is_unique_handled(column.name()) {
            if let Some(query) = Self::reconcile_unique(table, column, live)? {
                queries.push(query);
            }
            handled.mark_unique_handled(column.name());
        }
        Ok(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_table;
    use crate::schema::DefaultValue;

    fn accounts() -> Table {
        let mut table = Table::new("accounts").unwrap();
        table.create_column("login", "varchar(60)").unwrap().set_unique(true);
        table
            .create_column("role", "varchar(20)")
            .unwrap()
            .set_default(Some(DefaultValue::from("it's")))
            .unwrap()
            .set_comment(Some("user role"))
            .unwrap();
        table
    }

    #[test]
    fn test_missing_table() {
        let queries = plan_table(Dialect::MySql, &accounts(), &TableDescription::absent()).unwrap();
        let sql: Vec<&str> = queries.iter().map(|q| q.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE accounts (id int NOT NULL AUTO_INCREMENT PRIMARY KEY)",
                "ALTER TABLE accounts ADD login varchar(60) NOT NULL",
                "CREATE UNIQUE INDEX accounts_login_mksql_uindex ON accounts(login)",
                "ALTER TABLE accounts ADD role varchar(20) DEFAULT 'it''s' NULL COMMENT 'user role'",
            ]
        );
        assert_eq!(queries[1].column.as_deref(), Some("login"));
    }

    #[test]
    fn test_create_table_with_comment_and_text_key() {
        let mut table = Table::new("tokens").unwrap();
        table.set_primary_key_type("varchar(36)").unwrap();
        table.set_comment(Some("api tokens")).unwrap();
        let query = MySqlGenerator.create_table(&table).unwrap();
        assert_eq!(
            query.sql,
            "CREATE TABLE tokens (id varchar(36) NOT NULL PRIMARY KEY) COMMENT 'api tokens'"
        );
    }

    #[test]
    fn test_backslashes_escaped() {
        assert_eq!(MySqlGenerator.quote_literal(r"a\b'c"), r"'a\\b''c'");
    }

    #[test]
    fn test_modify_carries_reasons() {
        let table = accounts();
        let mut description = TableDescription {
            table_exists: true,
            primary_key_name: Some("id".into()),
            ..TableDescription::default()
        };
        description.columns.insert(
            "login".into(),
            ColumnDescription {
                column_exists: true,
                sql_type: "varchar(40)".into(),
                not_null: true,
                unique_index: Some("accounts_login_mksql_uindex".into()),
                ..ColumnDescription::default()
            },
        );
        description.columns.insert(
            "role".into(),
            ColumnDescription {
                column_exists: true,
                sql_type: "varchar(20)".into(),
                default: Some("it's".into()),
                comment: Some("user role".into()),
                ..ColumnDescription::default()
            },
        );

        let queries = plan_table(Dialect::MySql, &table, &description).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].kind, QueryKind::AlterColumn);
        assert_eq!(
            queries[0].sql,
            "ALTER TABLE accounts MODIFY login varchar(60) NOT NULL"
        );
        assert_eq!(queries[0].reason, "type changed from varchar(40) to varchar(60)");
    }

    #[test]
    fn test_primary_key_rename_and_comment() {
        let mut table = Table::new("accounts").unwrap();
        table.set_primary_key_name("account_id").unwrap();
        let description = TableDescription {
            table_exists: true,
            primary_key_name: Some("id".into()),
            comment: Some("old".into()),
            ..TableDescription::default()
        };
        let queries = plan_table(Dialect::MySql, &table, &description).unwrap();
        let sql: Vec<&str> = queries.iter().map(|q| q.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE accounts CHANGE id account_id int NOT NULL AUTO_INCREMENT",
                "ALTER TABLE accounts COMMENT ''",
            ]
        );
    }
}
