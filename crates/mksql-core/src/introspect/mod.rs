//! Live-schema parsers.
//!
//! The database hands back DDL text (`SHOW CREATE TABLE` on MySQL, the
//! `sql` column of `sqlite_master` on SQLite). These parsers turn that text
//! into a [`TableDescription`](crate::description::TableDescription). They
//! only understand the syntax the generators in [`crate::dialect`] produce,
//! plus the rewrites the databases themselves apply to it (backticks,
//! display widths, quoted names after a rename). Fetching the text is left
//! to the caller.

mod mysql;
mod scan;
mod sqlite;

pub use mysql::parse_show_create_table;
pub use sqlite::{parse_sqlite_master, MasterRow};
