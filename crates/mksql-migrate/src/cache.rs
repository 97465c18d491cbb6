//! Tables already reconciled during the current session.

use std::collections::HashMap;

use mksql_core::Table;

/// Structural hashes of the tables reconciled by the last successful pass.
///
/// A table whose declaration still hashes to the recorded value is skipped
/// without describing it again. Call [`ProcessedTables::reset`] when the
/// database may have changed behind the reconciler's back.
#[derive(Debug, Clone, Default)]
pub struct ProcessedTables {
    hashes: HashMap<String, String>,
}

impl ProcessedTables {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `table` was reconciled with this exact shape.
    #[must_use]
    pub fn is_unchanged(&self, table: &Table) -> bool {
        self.hashes
            .get(table.name())
            .is_some_and(|hash| *hash == table.structural_hash())
    }

    /// Records a structural hash computed for `table`.
    pub fn record(&mut self, table: impl Into<String>, hash: String) {
        self.hashes.insert(table.into(), hash);
    }

    /// Forgets one table.
    pub fn forget(&mut self, table: &str) -> bool {
        self.hashes.remove(table).is_some()
    }

    /// Forgets every table, ending the logical session.
    pub fn reset(&mut self) {
        self.hashes.clear();
    }

    /// Number of recorded tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
