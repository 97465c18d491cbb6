//! Dialect-specific diffing and DDL generation.
//!
//! Each supported database gets one [`QueryGenerator`]. The generator is
//! picked once per connection through the closed [`Dialect`] enum.

mod mysql;
mod sqlite;
pub mod types;

use std::fmt;

pub use mysql::MySqlGenerator;
pub use sqlite::SqliteGenerator;

use crate::description::{ColumnDescription, TableDescription};
use crate::error::Result;
use crate::plan::HandledColumns;
use crate::query::Query;
use crate::schema::{Column, ForeignKeyTarget, Table};
use crate::validate::shorten_key_name;

/// Suffix of generated unique index names.
pub const UNIQUE_INDEX_SUFFIX: &str = "mksql_uindex";
/// Suffix of generated foreign-key constraint names.
pub const FOREIGN_KEY_SUFFIX: &str = "mksql_fk";
/// Suffix of the temporary table used by the SQLite rebuild.
pub const REBUILD_TABLE_SUFFIX: &str = "mksql_tmp";

/// A supported database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL and MariaDB.
    MySql,
    /// SQLite 3.
    Sqlite,
}

impl Dialect {
    /// Picks the dialect from a connection URL scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Longest constraint or index name the engine accepts.
    #[must_use]
    pub const fn max_key_length(self) -> usize {
        match self {
            Self::MySql => 64,
            Self::Sqlite => 128,
        }
    }

    /// Lowercase engine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Returns the generator for this engine.
    #[must_use]
    pub fn generator(self) -> &'static dyn QueryGenerator {
        match self {
            Self::MySql => &MySqlGenerator,
            Self::Sqlite => &SqliteGenerator,
        }
    }

    /// Fits a generated name into the engine's key length.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid identifier.
    pub fn key_name(self, name: &str) -> Result<String> {
        shorten_key_name(name, self.max_key_length())
    }

    /// `{table}_{column}_mksql_uindex`, shortened.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined name is not a valid identifier.
    pub fn unique_index_name(self, table: &str, column: &str) -> Result<String> {
        self.key_name(&format!("{table}_{column}_{UNIQUE_INDEX_SUFFIX}"))
    }

    /// `{table}_{targetTable}_{column}_{targetColumn}_mksql_fk`, shortened.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined name is not a valid identifier.
    pub fn foreign_key_name(
        self,
        table: &str,
        column: &str,
        target: &ForeignKeyTarget,
    ) -> Result<String> {
        self.key_name(&format!(
            "{table}_{}_{column}_{}_{FOREIGN_KEY_SUFFIX}",
            target.table, target.column
        ))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Diffs desired columns against their live description and emits DDL.
///
/// Generation never touches the database. It fails only on input that
/// cannot be turned into a valid statement.
pub trait QueryGenerator: Sync {
    /// The engine this generator targets.
    fn dialect(&self) -> Dialect;

    /// Whether the engine stores column comments.
    fn supports_comments(&self) -> bool;

    /// Default the column is expected to have once created.
    fn effective_default(&self, column: &Column) -> Option<String>;

    /// Quotes a string literal.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// `CREATE TABLE` holding only the primary key.
    ///
    /// # Errors
    ///
    /// Fails if a generated constraint name is invalid.
    fn create_table(&self, table: &Table) -> Result<Query>;

    /// Table-level changes on an existing table (primary key name, comment).
    ///
    /// # Errors
    ///
    /// Fails if a generated name is invalid.
    fn table_changes(
        &self,
        table: &Table,
        description: &TableDescription,
        handled: &mut HandledColumns,
    ) -> Result<Vec<Query>>;

    /// Statements bringing one column to its desired state, in execution order.
    ///
    /// # Errors
    ///
    /// Fails if a generated name is invalid.
    fn generate(
        &self,
        table: &Table,
        column: &Column,
        description: &TableDescription,
        handled: &mut HandledColumns,
    ) -> Result<Vec<Query>>;

    /// Human-readable differences between a column and its live state.
    fn change_reasons(&self, column: &Column, live: &ColumnDescription) -> Vec<String> {
        let mut reasons = Vec::new();
        if !types::types_equal(self.dialect(), column.sql_type(), &live.sql_type) {
            reasons.push(format!(
                "type changed from {} to {}",
                live.sql_type,
                column.sql_type()
            ));
        }
        if column.not_null() != live.not_null {
            reasons.push(if column.not_null() {
                "column became NOT NULL".to_string()
            } else {
                "column became nullable".to_string()
            });
        }
        if self.supports_comments() && column.comment() != live.comment.as_deref() {
            reasons.push(format!(
                "comment changed from {} to {}",
                describe_value(live.comment.as_deref()),
                describe_value(column.comment())
            ));
        }
        let desired_default = self.effective_default(column);
        if !defaults_equal(
            self.dialect(),
            column.sql_type(),
            desired_default.as_deref(),
            live.default.as_deref(),
        ) {
            reasons.push(format!(
                "default changed from {} to {}",
                describe_value(live.default.as_deref()),
                describe_value(desired_default.as_deref())
            ));
        }
        reasons
    }
}

fn describe_value(value: Option<&str>) -> String {
    value.map_or_else(|| "none".to_string(), |v| format!("'{v}'"))
}

/// Compares default literals of a column of type `sql_type`.
///
/// Numeric columns treat numerically equal literals (`0` and `0.00`) as
/// equal; every other type compares the text exactly.
#[must_use]
pub fn defaults_equal(
    dialect: Dialect,
    sql_type: &str,
    desired: Option<&str>,
    live: Option<&str>,
) -> bool {
    match (desired, live) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a == b
                || (types::is_numeric_type(dialect, sql_type)
                    && matches!(
                        (a.parse::<f64>(), b.parse::<f64>()),
                        (Ok(x), Ok(y)) if (x - y).abs() < f64::EPSILON
                    ))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("mysql://root@localhost/db"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("MariaDB://x"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("postgres://x"), None);
    }

    #[test]
    fn test_generated_names() {
        let target = ForeignKeyTarget::parse("accounts.id").unwrap();
        assert_eq!(
            Dialect::MySql.unique_index_name("accounts", "login").unwrap(),
            "accounts_login_mksql_uindex"
        );
        assert_eq!(
            Dialect::Sqlite
                .foreign_key_name("sessions", "account", &target)
                .unwrap(),
            "sessions_accounts_account_id_mksql_fk"
        );

        let long_table = "a_really_long_table_name_that_keeps_going";
        let long = Dialect::MySql
            .foreign_key_name(long_table, "owner_account", &target)
            .unwrap();
        assert!(long.len() <= 64);
        assert_eq!(
            long,
            Dialect::MySql
                .foreign_key_name(long_table, "owner_account", &target)
                .unwrap()
        );
        assert!(Dialect::Sqlite
            .foreign_key_name(long_table, "owner_account", &target)
            .unwrap()
            .ends_with("_mksql_fk"));
    }

    #[test]
    fn test_defaults_equal() {
        let eq = |sql_type: &str, a: Option<&str>, b: Option<&str>| {
            defaults_equal(Dialect::MySql, sql_type, a, b)
        };
        assert!(eq("int", None, None));
        assert!(eq("decimal(10,2)", Some("1.5"), Some("1.50")));
        assert!(eq("decimal(10,2)", Some("0"), Some("0.00")));
        assert!(eq("bool", Some("1"), Some("1")));
        assert!(eq("text", Some(""), Some("")));
        assert!(!eq("text", Some(""), None));
        assert!(!eq("varchar(20)", Some("guest"), Some("Guest")));
    }

    #[test]
    fn test_text_defaults_compare_exactly() {
        for dialect in [Dialect::MySql, Dialect::Sqlite] {
            assert!(!defaults_equal(dialect, "varchar(10)", Some("01"), Some("1")));
            assert!(!defaults_equal(dialect, "text", Some("1.0"), Some("1")));
            assert!(!defaults_equal(dialect, "char(3)", Some("1e2"), Some("100")));
            assert!(defaults_equal(dialect, "real", Some("1e2"), Some("100")));
            assert!(defaults_equal(dialect, "integer", Some("01"), Some("1")));
        }
    }
}
