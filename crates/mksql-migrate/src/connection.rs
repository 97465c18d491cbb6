//! The single database connection a reconciliation runs on.

use mksql_core::Dialect;
use sqlx::mysql::MySqlConnection;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// A connection to one of the supported engines.
///
/// Every statement of a pass goes through the same connection, one at a
/// time. No pool is involved.
#[derive(Debug)]
pub enum DbConnection {
    /// SQLite connection.
    Sqlite(SqliteConnection),
    /// MySQL or MariaDB connection.
    MySql(MySqlConnection),
}

impl DbConnection {
    /// Opens a connection, picking the engine from the URL scheme.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported scheme or when the driver cannot connect.
    pub async fn connect(url: &str) -> Result<Self> {
        let dialect = Dialect::from_url(url)
            .ok_or_else(|| MigrateError::UnsupportedDatabaseUrl(url.to_string()))?;
        debug!(dialect = %dialect, "Connecting");
        Ok(match dialect {
            Dialect::Sqlite => Self::Sqlite(SqliteConnection::connect(url).await?),
            Dialect::MySql => Self::MySql(MySqlConnection::connect(url).await?),
        })
    }

    /// The dialect used to describe and diff tables on this connection.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        match self {
            Self::Sqlite(_) => Dialect::Sqlite,
            Self::MySql(_) => Dialect::MySql,
        }
    }

    /// Runs one statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged so the caller can attach context.
    pub async fn execute(&mut self, sql: &str) -> std::result::Result<u64, sqlx::Error> {
        let result = match self {
            Self::Sqlite(conn) => sqlx::query(sql).execute(&mut *conn).await?.rows_affected(),
            Self::MySql(conn) => sqlx::query(sql).execute(&mut *conn).await?.rows_affected(),
        };
        Ok(result)
    }

    /// Closes the connection cleanly.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the close handshake fails.
    pub async fn close(self) -> Result<()> {
        match self {
            Self::Sqlite(conn) => conn.close().await?,
            Self::MySql(conn) => conn.close().await?,
        }
        Ok(())
    }
}

impl From<SqliteConnection> for DbConnection {
    fn from(conn: SqliteConnection) -> Self {
        Self::Sqlite(conn)
    }
}

impl From<MySqlConnection> for DbConnection {
    fn from(conn: MySqlConnection) -> Self {
        Self::MySql(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_sqlite_memory() {
        let mut conn = DbConnection::connect("sqlite::memory:").await.unwrap();
        assert_eq!(conn.dialect(), Dialect::Sqlite);
        conn.execute("CREATE TABLE t (id integer)").await.unwrap();
        assert_eq!(conn.execute("INSERT INTO t (id) VALUES (1)").await.unwrap(), 1);
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_url() {
        let err = DbConnection::connect("postgres://localhost/db").await.unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedDatabaseUrl(_)));
    }
}
