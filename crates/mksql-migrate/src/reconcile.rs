//! The reconciliation pass: order, describe, diff, collect, execute.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use chrono::Utc;
use mksql_core::{
    dependency_order, plan_table, Dialect, Query, QueryKind, SchemaError, SchemaRegistry,
    TableDescription,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ProcessedTables;
use crate::connection::DbConnection;
use crate::describe::describe_table;
use crate::error::{MigrateError, Result};
use crate::report::{MeasurementSink, ReconcileReport, TracingSink};

/// Where a reconciler is in its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// No pass has run yet.
    Idle,
    /// Validating references and ordering tables.
    Ordering,
    /// Reading the live state of a table.
    Describing,
    /// Comparing a table with its description.
    Diffing,
    /// Appending a table's statements to the queue.
    Collecting,
    /// Running the queue.
    Executing,
    /// The last pass succeeded.
    Done,
    /// The last pass failed.
    Failed,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Ordering => "ordering",
            Self::Describing => "describing",
            Self::Diffing => "diffing",
            Self::Collecting => "collecting",
            Self::Executing => "executing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Options for a reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Plan and report statements without running them.
    pub dry_run: bool,
}

/// Statements collected for one pass, before execution.
#[derive(Debug, Default)]
struct Collected {
    queries: Vec<Query>,
    skipped: Vec<String>,
    hashes: Vec<(String, String)>,
}

/// Brings a database in line with a [`SchemaRegistry`].
///
/// The reconciler owns the registry and the cache of tables already
/// processed in this session. Each pass runs sequentially on the
/// connection it is given.
pub struct Reconciler {
    registry: SchemaRegistry,
    processed: ProcessedTables,
    options: ReconcileOptions,
    sink: Box<dyn MeasurementSink>,
    state: ReconcileState,
    declaring: bool,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("registry", &self.registry)
            .field("processed", &self.processed)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("declaring", &self.declaring)
            .finish_non_exhaustive()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(SchemaRegistry::new())
    }
}

impl Reconciler {
    /// Creates a reconciler for `registry`.
    #[must_use]
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            processed: ProcessedTables::new(),
            options: ReconcileOptions::default(),
            sink: Box::new(TracingSink),
            state: ReconcileState::Idle,
            declaring: false,
        }
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the measurement sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl MeasurementSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// The declared schema.
    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The declared schema, for further declarations.
    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    /// Tables reconciled in this session.
    #[must_use]
    pub const fn processed(&self) -> &ProcessedTables {
        &self.processed
    }

    /// Forgets every reconciled table so the next pass describes them all.
    pub fn reset_session(&mut self) {
        self.processed.reset();
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> ReconcileState {
        self.state
    }

    /// The options in effect.
    #[must_use]
    pub const fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Runs `declare` inside a declaration scope.
    ///
    /// Any pass started from inside the scope fails with
    /// [`MigrateError::ReentrantReconcile`].
    ///
    /// # Errors
    ///
    /// Returns whatever `declare` returns.
    pub fn declare<T>(&mut self, declare: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outer = self.declaring;
        self.declaring = true;
        let result = declare(self);
        self.declaring = outer;
        result
    }

    fn ensure_not_declaring(&self) -> Result<()> {
        if self.declaring {
            return Err(MigrateError::ReentrantReconcile);
        }
        Ok(())
    }

    /// Describes and diffs every changed table without running anything.
    ///
    /// Tables unchanged since the last pass are skipped. The processed cache
    /// is not modified.
    ///
    /// # Errors
    ///
    /// Fails on invalid references, description errors, or invalid
    /// generated names.
    pub async fn plan(&mut self, conn: &mut DbConnection) -> Result<ReconcileReport> {
        self.ensure_not_declaring()?;
        let started_at = Utc::now();
        let started = Instant::now();
        let result = self.collect(conn).await;
        let collected = self.settle(result)?;
        Ok(Self::report(conn.dialect(), true, collected, started_at, started))
    }

    /// Runs `queries` in order on `conn`.
    ///
    /// The first failing statement aborts the queue.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Execution`] with the failing statement.
    pub async fn execute(
        &mut self,
        conn: &mut DbConnection,
        queries: Vec<Query>,
    ) -> Result<Vec<Query>> {
        self.ensure_not_declaring()?;
        let result = self.run_queries(conn, queries).await;
        self.settle(result)
    }

    /// Runs a full pass: order, describe, diff, collect, execute.
    ///
    /// In dry-run mode the statements are reported but not run, and the
    /// processed cache is left untouched.
    ///
    /// # Errors
    ///
    /// Fails on invalid references, description errors, invalid generated
    /// names, or the first statement the database rejects.
    pub async fn reconcile(&mut self, conn: &mut DbConnection) -> Result<ReconcileReport> {
        self.ensure_not_declaring()?;
        let started_at = Utc::now();
        let started = Instant::now();
        let dialect = conn.dialect();
        info!(
            dialect = %dialect,
            tables = self.registry.len(),
            dry_run = self.options.dry_run,
            "Starting reconciliation"
        );

        let result = self.collect(conn).await;
        let mut collected = self.settle(result)?;

        if self.options.dry_run {
            warn!(
                statements = collected.queries.len(),
                "Dry run: statements were not executed"
            );
            return Ok(Self::report(dialect, true, collected, started_at, started));
        }

        let queries = std::mem::take(&mut collected.queries);
        let result = self.run_queries(conn, queries).await;
        collected.queries = self.settle(result)?;
        for (table, hash) in collected.hashes.drain(..) {
            self.processed.record(table, hash);
        }

        let report = Self::report(dialect, false, collected, started_at, started);
        info!(
            executed = report.executed_count(),
            skipped = report.skipped_tables.len(),
            elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Plans against descriptions captured earlier.
    ///
    /// Tables missing from `descriptions` are treated as absent. The
    /// processed cache is ignored.
    ///
    /// # Errors
    ///
    /// Fails on invalid references or invalid generated names.
    pub fn diff_against(
        &self,
        dialect: Dialect,
        descriptions: &HashMap<String, TableDescription>,
    ) -> Result<Vec<Query>> {
        self.ensure_not_declaring()?;
        self.registry.validate_references()?;
        let absent = TableDescription::absent();
        let mut queries = Vec::new();
        for name in dependency_order(&self.registry)? {
            let table = self
                .registry
                .table(&name)
                .ok_or_else(|| SchemaError::OrderedTableMissing(name.clone()))?;
            let description = descriptions.get(&name).unwrap_or(&absent);
            queries.extend(plan_table(dialect, table, description)?);
        }
        Ok(queries)
    }

    /// Describes one declared table as it currently exists.
    ///
    /// # Errors
    ///
    /// Fails if the table is not declared or cannot be described.
    pub async fn describe(
        &self,
        conn: &mut DbConnection,
        table: &str,
    ) -> Result<TableDescription> {
        self.ensure_not_declaring()?;
        let declared = self
            .registry
            .table(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))?;
        describe_table(conn, declared, &self.registry).await
    }

    async fn collect(&mut self, conn: &mut DbConnection) -> Result<Collected> {
        let dialect = conn.dialect();
        self.state = ReconcileState::Ordering;
        let phase = Instant::now();
        self.registry.validate_references()?;
        let order = dependency_order(&self.registry)?;
        self.sink
            .record_phase(ReconcileState::Ordering, None, phase.elapsed());
        debug!(order = ?order, "Ordered tables");

        let mut collected = Collected::default();
        for name in order {
            let table = self
                .registry
                .table(&name)
                .ok_or_else(|| SchemaError::OrderedTableMissing(name.clone()))?;
            if self.processed.is_unchanged(table) {
                debug!(table = %name, "Unchanged since last pass, skipping");
                collected.skipped.push(name);
                continue;
            }

            self.state = ReconcileState::Describing;
            let phase = Instant::now();
            let description = describe_table(conn, table, &self.registry).await?;
            self.sink
                .record_phase(ReconcileState::Describing, Some(&name), phase.elapsed());

            self.state = ReconcileState::Diffing;
            let phase = Instant::now();
            let queries = plan_table(dialect, table, &description)?;
            self.sink
                .record_phase(ReconcileState::Diffing, Some(&name), phase.elapsed());

            self.state = ReconcileState::Collecting;
            if !queries.is_empty() {
                info!(table = %name, statements = queries.len(), "Table needs changes");
            }
            collected.hashes.push((name, table.structural_hash()));
            collected.queries.extend(queries);
        }
        Ok(collected)
    }

    async fn run_queries(
        &mut self,
        conn: &mut DbConnection,
        queries: Vec<Query>,
    ) -> Result<Vec<Query>> {
        self.state = ReconcileState::Executing;
        let phase = Instant::now();
        let mut executed = Vec::with_capacity(queries.len());
        for mut query in queries {
            debug!(table = %query.table, reason = %query.reason, sql = %query.sql, "Executing");
            let started_at = Utc::now();
            let started = Instant::now();
            match conn.execute(&query.sql).await {
                Ok(_) => {
                    query.mark_executed(started_at, started.elapsed());
                    self.sink.record_query(&query);
                    executed.push(query);
                }
                Err(source) => {
                    query.mark_failed(started_at, started.elapsed(), &source.to_string());
                    self.sink.record_query(&query);
                    if foreign_keys_left_off(&executed) {
                        restore_foreign_keys(conn).await;
                    }
                    return Err(MigrateError::Execution {
                        table: query.table,
                        column: query.column,
                        sql: query.sql,
                        source,
                    });
                }
            }
        }
        self.sink
            .record_phase(ReconcileState::Executing, None, phase.elapsed());
        Ok(executed)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        self.state = if result.is_ok() {
            ReconcileState::Done
        } else {
            ReconcileState::Failed
        };
        result
    }

    fn report(
        dialect: Dialect,
        dry_run: bool,
        collected: Collected,
        started_at: chrono::DateTime<Utc>,
        started: Instant,
    ) -> ReconcileReport {
        ReconcileReport {
            dialect: dialect.name().to_string(),
            dry_run,
            queries: collected.queries,
            skipped_tables: collected.skipped,
            started_at,
            elapsed: started.elapsed(),
        }
    }
}

/// Returns whether the last foreign-key toggle among `executed` turned them off.
fn foreign_keys_left_off(executed: &[Query]) -> bool {
    executed
        .iter()
        .rev()
        .find(|q| matches!(q.kind, QueryKind::DisableForeignKeys | QueryKind::EnableForeignKeys))
        .is_some_and(|q| q.kind == QueryKind::DisableForeignKeys)
}

async fn restore_foreign_keys(conn: &mut DbConnection) {
    if let Err(err) = conn.execute("PRAGMA foreign_keys=ON").await {
        warn!(error = %err, "Failed to re-enable foreign keys after an aborted rebuild");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mksql_core::ColumnDescription;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register_table("accounts")
            .unwrap()
            .create_column("login", "varchar(60)")
            .unwrap()
            .set_unique(true);
        registry
    }

    #[test]
    fn test_diff_against_absent_tables() {
        let reconciler = Reconciler::new(registry());
        let queries = reconciler
            .diff_against(Dialect::MySql, &HashMap::new())
            .unwrap();
        let kinds: Vec<QueryKind> = queries.iter().map(|q| q.kind).collect();
        assert_eq!(
            kinds,
            vec![
                QueryKind::CreateTable,
                QueryKind::AddColumn,
                QueryKind::CreateUniqueIndex
            ]
        );
    }

    #[test]
    fn test_diff_against_matching_description() {
        let reconciler = Reconciler::new(registry());
        let mut columns = std::collections::BTreeMap::new();
        columns.insert(
            "login".to_string(),
            ColumnDescription {
                column_exists: true,
                sql_type: "varchar(60)".to_string(),
                not_null: true,
                unique_index: Some("accounts_login_mksql_uindex".to_string()),
                ..ColumnDescription::default()
            },
        );
        let mut descriptions = HashMap::new();
        descriptions.insert(
            "accounts".to_string(),
            TableDescription {
                table_exists: true,
                primary_key_name: Some("id".to_string()),
                comment: None,
                columns,
            },
        );
        assert!(reconciler
            .diff_against(Dialect::MySql, &descriptions)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_declare_scope_rejects_diff() {
        let mut reconciler = Reconciler::default();
        let err = reconciler
            .declare(|r| {
                r.registry_mut().register_table("accounts")?;
                r.diff_against(Dialect::Sqlite, &HashMap::new())
            })
            .unwrap_err();
        assert!(matches!(err, MigrateError::ReentrantReconcile));
        assert!(err.is_programming_error());

        assert!(reconciler.registry().table("accounts").is_some());
        assert_eq!(
            reconciler
                .diff_against(Dialect::Sqlite, &HashMap::new())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_declare_scope_rejects_describe() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let mut reconciler = Reconciler::new(registry());
        let mut conn = runtime
            .block_on(DbConnection::connect("sqlite::memory:"))
            .unwrap();
        let err = reconciler
            .declare(|r| runtime.block_on(r.describe(&mut conn, "accounts")))
            .unwrap_err();
        assert!(matches!(err, MigrateError::ReentrantReconcile));

        let description = runtime
            .block_on(reconciler.describe(&mut conn, "accounts"))
            .unwrap();
        assert!(!description.table_exists);
    }

    #[test]
    fn test_foreign_keys_left_off() {
        let toggle = |kind| Query::table("accounts", kind, "PRAGMA", "rebuild");
        assert!(!foreign_keys_left_off(&[]));
        assert!(foreign_keys_left_off(&[
            toggle(QueryKind::DisableForeignKeys),
            toggle(QueryKind::RebuildCreate),
        ]));
        assert!(!foreign_keys_left_off(&[
            toggle(QueryKind::DisableForeignKeys),
            toggle(QueryKind::EnableForeignKeys),
            toggle(QueryKind::CreateUniqueIndex),
        ]));
    }

    #[test]
    fn test_initial_state() {
        let reconciler = Reconciler::default();
        assert_eq!(reconciler.state(), ReconcileState::Idle);
        assert_eq!(ReconcileState::Describing.to_string(), "describing");
    }
}
