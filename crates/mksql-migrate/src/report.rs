//! Timing measurements and the summary of a reconciliation pass.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mksql_core::Query;
use serde::Serialize;
use tracing::{debug, warn};

use crate::reconcile::ReconcileState;

/// Receives timings from the reconciler.
pub trait MeasurementSink: Send + Sync {
    /// A phase finished, optionally for one table.
    fn record_phase(&self, phase: ReconcileState, table: Option<&str>, elapsed: Duration);

    /// A statement was run (or failed).
    fn record_query(&self, query: &Query);
}

/// Reports measurements as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MeasurementSink for TracingSink {
    fn record_phase(&self, phase: ReconcileState, table: Option<&str>, elapsed: Duration) {
        debug!(
            phase = %phase,
            table = table.unwrap_or("-"),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Phase finished"
        );
    }

    fn record_query(&self, query: &Query) {
        let elapsed_ms = query
            .outcome
            .elapsed
            .map_or(0.0, |e| e.as_secs_f64() * 1000.0);
        match &query.outcome.error {
            Some(error) => warn!(
                table = %query.table,
                sql = %query.sql,
                elapsed_ms,
                error = %error,
                "Statement failed"
            ),
            None => debug!(
                table = %query.table,
                sql = %query.sql,
                elapsed_ms,
                "Statement executed"
            ),
        }
    }
}

/// One recorded phase timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    /// The phase.
    pub phase: ReconcileState,
    /// Table the phase worked on, if any.
    pub table: Option<String>,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Recorded {
    phases: Vec<PhaseTiming>,
    queries: Vec<Query>,
}

/// Collects measurements in memory.
///
/// Clones share the same storage, so a clone can be handed to the
/// reconciler and read back afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase timings recorded so far.
    #[must_use]
    pub fn phases(&self) -> Vec<PhaseTiming> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phases
            .clone()
    }

    /// Statements recorded so far.
    #[must_use]
    pub fn queries(&self) -> Vec<Query> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queries
            .clone()
    }
}

impl MeasurementSink for MemorySink {
    fn record_phase(&self, phase: ReconcileState, table: Option<&str>, elapsed: Duration) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phases
            .push(PhaseTiming {
                phase,
                table: table.map(str::to_string),
                elapsed,
            });
    }

    fn record_query(&self, query: &Query) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queries
            .push(query.clone());
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// Dialect of the connection.
    pub dialect: String,
    /// Whether statements were only planned.
    pub dry_run: bool,
    /// Generated statements in execution order, with their outcomes.
    pub queries: Vec<Query>,
    /// Tables skipped because they were unchanged since the last pass.
    pub skipped_tables: Vec<String>,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// Total duration of the pass.
    pub elapsed: Duration,
}

impl ReconcileReport {
    /// Number of statements that ran.
    #[must_use]
    pub fn executed_count(&self) -> usize {
        self.queries.iter().filter(|q| q.outcome.executed).count()
    }

    /// Returns `true` if the database already matched the declaration.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.queries.is_empty()
    }

    /// Renders the statements as a SQL script with reasons as comments.
    #[must_use]
    pub fn to_sql_script(&self) -> String {
        self.queries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
