//! Desired-state schema model.
//!
//! Tables and columns are declared in code through a [`SchemaRegistry`]:
//!
//! ```
//! use mksql_core::schema::SchemaRegistry;
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .register_table("accounts")?
//!     .create_column("login", "varchar(60)")?
//!     .set_unique(true);
//! registry
//!     .register_table("sessions")?
//!     .create_column("account", "int")?
//!     .add_foreign_key("accounts.id")?;
//!
//! assert_eq!(registry.tables().len(), 2);
//! # Ok::<(), mksql_core::SchemaError>(())
//! ```

mod column;
mod registry;
mod table;

pub use column::{Column, DefaultValue, ForeignKeyTarget, DEFAULT_COLUMN_TYPE};
pub use registry::{ForeignKeyMode, SchemaRegistry, TableHandle};
pub use table::{Table, DEFAULT_PRIMARY_KEY_NAME, DEFAULT_PRIMARY_KEY_TYPE};
