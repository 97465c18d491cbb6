//! Declarative schema reconciliation for MySQL and SQLite.
//!
//! `mksql-migrate` compares the tables declared in a
//! [`SchemaRegistry`](mksql_core::SchemaRegistry) with what the database
//! currently holds, and runs the DDL that closes the gap:
//! - Missing tables and columns are created
//! - Changed types, nullability, defaults and comments are altered
//! - Unique indexes and foreign keys follow the declaration
//! - Running a pass twice changes nothing the second time
//!
//! # Architecture
//!
//! - **Connection** - One sqlx connection, MySQL or SQLite
//! - **Describe** - Reads the live shape of a declared table
//! - **Reconciler** - Orders tables, diffs them and runs the statements
//! - **Report** - Timings and the outcome of every statement
//! - **Config** - JSON schema files for the `mksql` CLI
//!
//! # Example
//!
//! ```rust,no_run
//! use mksql_migrate::prelude::*;
//!
//! # async fn run() -> mksql_migrate::error::Result<()> {
//! let mut reconciler = Reconciler::default();
//! reconciler.declare(|r| {
//!     let registry = r.registry_mut();
//!     registry
//!         .register_table("accounts")?
//!         .create_column("login", "varchar(60)")?
//!         .set_unique(true);
//!     registry
//!         .register_table("sessions")?
//!         .create_column("account", "int")?
//!         .add_foreign_key("accounts.id")?;
//!     Ok(())
//! })?;
//!
//! let mut conn = DbConnection::connect("sqlite::memory:").await?;
//! let report = reconciler.reconcile(&mut conn).await?;
//! println!("{}", report.to_sql_script());
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what would change
//! mksql -d sqlite:app.db plan --schema schema.json
//!
//! # Apply it
//! mksql -d mysql://root@localhost/app reconcile --schema schema.json
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod describe;
pub mod error;
pub mod reconcile;
pub mod report;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cache::ProcessedTables;
    pub use crate::config::{ColumnSpec, SchemaFile, TableSpec};
    pub use crate::connection::DbConnection;
    pub use crate::describe::describe_table;
    pub use crate::error::{MigrateError, Result};
    pub use crate::reconcile::{ReconcileOptions, ReconcileState, Reconciler};
    pub use crate::report::{
        MeasurementSink, MemorySink, PhaseTiming, ReconcileReport, TracingSink,
    };
    pub use mksql_core::{
        Column, DefaultValue, Dialect, ForeignKeyMode, Query, QueryKind, SchemaRegistry, Table,
        TableDescription,
    };
}
