//! # mksql-core
//!
//! Declarative schema reconciliation without database I/O.
//!
//! This crate provides:
//! - A validated, in-memory schema model (tables, columns, foreign keys)
//! - Dependency ordering of tables along their foreign keys
//! - Parsers that describe live tables from MySQL and SQLite DDL text
//! - Per-dialect diffing that turns the gap between both into DDL
//!
//! ## Planning a table
//!
//! ```rust
//! use mksql_core::{Dialect, SchemaRegistry, TableDescription, plan_table};
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .register_table("accounts")?
//!     .create_column("login", "varchar(60)")?
//!     .set_unique(true);
//!
//! let accounts = registry.table("accounts").unwrap();
//! let queries = plan_table(Dialect::MySql, accounts, &TableDescription::absent())?;
//!
//! assert_eq!(
//!     queries[0].sql,
//!     "CREATE TABLE accounts (id int NOT NULL AUTO_INCREMENT PRIMARY KEY)"
//! );
//! assert_eq!(queries.len(), 3);
//! # Ok::<(), mksql_core::SchemaError>(())
//! ```
//!
//! ## Identifier safety
//!
//! DDL is assembled by string concatenation, so every identifier, type,
//! comment and default passes through [`validate`] before it is stored:
//!
//! ```rust
//! use mksql_core::SchemaRegistry;
//!
//! let mut registry = SchemaRegistry::new();
//! let mut users = registry.register_table("users")?;
//! assert!(users.create_column("name; DROP TABLE users", "text").is_err());
//! # Ok::<(), mksql_core::SchemaError>(())
//! ```

pub mod description;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod order;
pub mod plan;
pub mod query;
pub mod schema;
pub mod validate;

pub use description::{ColumnDescription, TableDescription};
pub use dialect::{Dialect, QueryGenerator};
pub use error::{Result, SchemaError};
pub use order::dependency_order;
pub use plan::{plan_table, HandledColumns};
pub use query::{Query, QueryKind, QueryOutcome};
pub use schema::{
    Column, DefaultValue, ForeignKeyMode, ForeignKeyTarget, SchemaRegistry, Table, TableHandle,
};
