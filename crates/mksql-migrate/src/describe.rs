//! Reading live table descriptions from the database.

use mksql_core::introspect::{parse_show_create_table, parse_sqlite_master, MasterRow};
use mksql_core::{SchemaRegistry, Table, TableDescription};
use sqlx::mysql::{MySqlConnection, MySqlDatabaseError};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use tracing::debug;

use crate::connection::DbConnection;
use crate::error::Result;

/// MySQL error number for "table doesn't exist".
const ER_NO_SUCH_TABLE: u16 = 1146;

/// SQLSTATE for "base table or view not found".
const SQLSTATE_NO_SUCH_TABLE: &str = "42S02";

/// Describes the live state of `table`.
///
/// A missing table yields `table_exists = false`; every other driver error
/// is returned.
///
/// # Errors
///
/// Returns [`MigrateError::Database`](crate::error::MigrateError::Database)
/// when the database cannot be read.
pub async fn describe_table(
    conn: &mut DbConnection,
    table: &Table,
    registry: &SchemaRegistry,
) -> Result<TableDescription> {
    let description = match conn {
        DbConnection::MySql(conn) => describe_mysql(conn, table).await?,
        DbConnection::Sqlite(conn) => describe_sqlite(conn, table, registry).await?,
    };
    debug!(
        table = %table.name(),
        exists = description.table_exists,
        "Described table"
    );
    Ok(description)
}

async fn describe_mysql(conn: &mut MySqlConnection, table: &Table) -> Result<TableDescription> {
    let sql = format!("SHOW CREATE TABLE {}", table.name());
    let row = match sqlx::query(&sql).fetch_one(&mut *conn).await {
        Ok(row) => row,
        Err(err) if is_missing_table(&err) => return Ok(TableDescription::absent()),
        Err(err) => return Err(err.into()),
    };
    // Some server versions flag the column as binary.
    let create_sql: String = match row.try_get::<String, _>(1) {
        Ok(text) => text,
        Err(_) => String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(1)?).into_owned(),
    };
    Ok(parse_show_create_table(&create_sql, table))
}

fn is_missing_table(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    db_err.code().as_deref() == Some(SQLSTATE_NO_SUCH_TABLE)
        || db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|e| e.number() == ER_NO_SUCH_TABLE)
}

async fn describe_sqlite(
    conn: &mut SqliteConnection,
    table: &Table,
    registry: &SchemaRegistry,
) -> Result<TableDescription> {
    let rows: Vec<(String, String, Option<String>)> =
        sqlx::query_as("SELECT type, name, sql FROM sqlite_master WHERE tbl_name = ?")
            .bind(table.name())
            .fetch_all(&mut *conn)
            .await?;
    let rows: Vec<MasterRow> = rows
        .into_iter()
        .map(|(kind, name, sql)| MasterRow { kind, name, sql })
        .collect();
    Ok(parse_sqlite_master(&rows, table, registry))
}
