//! Generated DDL statements.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a generated statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// `CREATE TABLE` with only the primary key.
    CreateTable,
    /// `ALTER TABLE ... ADD`.
    AddColumn,
    /// `ALTER TABLE ... MODIFY` (MySQL).
    AlterColumn,
    /// `ALTER TABLE ... CHANGE` of the primary key (MySQL).
    RenamePrimaryKey,
    /// `ALTER TABLE ... COMMENT` (MySQL).
    AlterTableComment,
    /// `PRAGMA foreign_keys=OFF` ahead of a rebuild (SQLite).
    DisableForeignKeys,
    /// Rebuild: create the temporary table (SQLite).
    RebuildCreate,
    /// Rebuild: copy rows into the temporary table (SQLite).
    RebuildCopy,
    /// Rebuild: drop the original table (SQLite).
    RebuildDrop,
    /// Rebuild: rename the temporary table (SQLite).
    RebuildRename,
    /// `PRAGMA foreign_keys=ON` after a rebuild (SQLite).
    EnableForeignKeys,
    /// `CREATE UNIQUE INDEX`.
    CreateUniqueIndex,
    /// `DROP INDEX`.
    DropUniqueIndex,
    /// Add a foreign-key constraint (MySQL).
    CreateForeignKey,
    /// Drop a foreign-key constraint (MySQL).
    DropForeignKey,
}

impl QueryKind {
    /// Returns `true` for the four statements of a table rebuild.
    #[must_use]
    pub const fn is_rebuild(self) -> bool {
        matches!(
            self,
            Self::RebuildCreate | Self::RebuildCopy | Self::RebuildDrop | Self::RebuildRename
        )
    }
}

/// What happened when a statement was run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    /// Whether the statement ran to completion.
    pub executed: bool,
    /// Driver message when it failed.
    pub error: Option<String>,
    /// Wall-clock execution time.
    pub elapsed: Option<Duration>,
    /// When execution started.
    pub executed_at: Option<DateTime<Utc>>,
}

/// One DDL statement bound to the table and column it reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    /// Table the statement applies to.
    pub table: String,
    /// Column the statement was generated for, if any.
    pub column: Option<String>,
    /// Statement kind.
    pub kind: QueryKind,
    /// SQL text.
    pub sql: String,
    /// Why the statement was generated.
    pub reason: String,
    /// Execution result, filled in by the executor.
    pub outcome: QueryOutcome,
}

impl Query {
    /// Creates a table-level statement.
    pub fn table(
        table: impl Into<String>,
        kind: QueryKind,
        sql: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: None,
            kind,
            sql: sql.into(),
            reason: reason.into(),
            outcome: QueryOutcome::default(),
        }
    }

    /// Creates a statement generated for one column.
    pub fn column(
        table: impl Into<String>,
        column: impl Into<String>,
        kind: QueryKind,
        sql: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::table(table, kind, sql, reason)
        }
    }

    /// Records a successful run.
    pub fn mark_executed(&mut self, started_at: DateTime<Utc>, elapsed: Duration) {
        self.outcome = QueryOutcome {
            executed: true,
            error: None,
            elapsed: Some(elapsed),
            executed_at: Some(started_at),
        };
    }

    /// Records a failed run.
    pub fn mark_failed(&mut self, started_at: DateTime<Utc>, elapsed: Duration, error: &str) {
        self.outcome = QueryOutcome {
            executed: false,
            error: Some(error.to_string()),
            elapsed: Some(elapsed),
            executed_at: Some(started_at),
        };
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-- {}\n{};", self.reason, self.sql)
    }
}
