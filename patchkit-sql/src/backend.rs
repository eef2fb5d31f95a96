use std::time::Duration;

use sea_query_binder::{SqlxBinder, SqlxValues};

use crate::{Dialect, Record, Result};

#[cfg(feature = "pg")]
mod pg;
#[cfg(feature = "sqlite")]
mod sqlite;

/// Nullability and default of an existing column, as reported by the
/// database catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub not_null: bool,
    pub default: Option<String>,
}

/// Database specific plumbing used by sessions, the defaulter and the runner.
///
/// Every operation runs on a borrowed connection so it can take part in the
/// transaction the caller holds.
#[async_trait::async_trait]
pub trait Backend: sqlx::Database {
    const DIALECT: Dialect;

    /// Whether [`Backend::try_lock`] actually excludes other processes.
    const ADVISORY_LOCKS: bool;

    async fn execute(conn: &mut Self::Connection, sql: &str, values: SqlxValues) -> Result<u64>;

    async fn fetch_all(
        conn: &mut Self::Connection,
        sql: &str,
        values: SqlxValues,
    ) -> Result<Vec<Record>>;

    /// Runs one or more `;` separated statements without parameters.
    async fn execute_script(conn: &mut Self::Connection, sql: &str) -> Result<()>;

    /// Next value of the sequence backing `table.column`, if there is one.
    async fn next_id(conn: &mut Self::Connection, table: &str, column: &str)
        -> Result<Option<i64>>;

    async fn column_info(
        conn: &mut Self::Connection,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnInfo>>;

    /// Sets the default of a column. `default` is an SQL expression.
    async fn set_default(
        conn: &mut Self::Connection,
        table: &str,
        column: &str,
        default: &str,
    ) -> Result<()>;

    async fn set_not_null(conn: &mut Self::Connection, table: &str, column: &str) -> Result<()>;

    /// Bounds the duration of every statement issued by the current transaction.
    async fn statement_timeout(conn: &mut Self::Connection, timeout: Duration) -> Result<()>;

    /// Tries to take the session level lock identified by `key`.
    async fn try_lock(conn: &mut Self::Connection, key: i64) -> Result<bool>;

    async fn unlock(conn: &mut Self::Connection, key: i64) -> Result<()>;

    /// Builds and executes a statement, returning the number of affected rows.
    async fn run<S>(conn: &mut Self::Connection, statement: &S) -> Result<u64>
    where
        S: SqlxBinder + Sync,
    {
        let (sql, values) = Self::DIALECT.build(statement);
        Self::execute(conn, &sql, values).await
    }

    /// Builds and executes a query, returning every row.
    async fn query<S>(conn: &mut Self::Connection, statement: &S) -> Result<Vec<Record>>
    where
        S: SqlxBinder + Sync,
    {
        let (sql, values) = Self::DIALECT.build(statement);
        Self::fetch_all(conn, &sql, values).await
    }
}
