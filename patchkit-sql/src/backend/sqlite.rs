use std::time::Duration;

use sea_query_binder::SqlxValues;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

use self::ddl::Edit;
use super::{Backend, ColumnInfo};
use crate::dialect::quote_ident;
use crate::{Dialect, Kind, Record, Result, SqlError, Value};

mod ddl;

#[async_trait::async_trait]
impl Backend for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
    const ADVISORY_LOCKS: bool = false;

    async fn execute(conn: &mut SqliteConnection, sql: &str, values: SqlxValues) -> Result<u64> {
        let res = sqlx::query_with::<Sqlite, _>(sql, values)
            .execute(&mut *conn)
            .await?;

        Ok(res.rows_affected())
    }

    async fn fetch_all(
        conn: &mut SqliteConnection,
        sql: &str,
        values: SqlxValues,
    ) -> Result<Vec<Record>> {
        let rows = sqlx::query_with::<Sqlite, _>(sql, values)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn execute_script(conn: &mut SqliteConnection, sql: &str) -> Result<()> {
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql)).await?;

        Ok(())
    }

    async fn next_id(
        _conn: &mut SqliteConnection,
        _table: &str,
        _column: &str,
    ) -> Result<Option<i64>> {
        Ok(None)
    }

    async fn column_info(
        conn: &mut SqliteConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnInfo>> {
        let row = sqlx::query_as::<_, (i64, Option<String>)>(
            r#"SELECT "notnull", dflt_value FROM pragma_table_info($1) WHERE name = $2"#,
        )
        .bind(table)
        .bind(column)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|(not_null, default)| ColumnInfo {
            not_null: not_null != 0,
            default,
        }))
    }

    async fn set_default(
        conn: &mut SqliteConnection,
        table: &str,
        column: &str,
        default: &str,
    ) -> Result<()> {
        rebuild(conn, table, column, Edit::Default(default)).await
    }

    async fn set_not_null(conn: &mut SqliteConnection, table: &str, column: &str) -> Result<()> {
        rebuild(conn, table, column, Edit::NotNull).await
    }

    async fn statement_timeout(_conn: &mut SqliteConnection, timeout: Duration) -> Result<()> {
        tracing::debug!(?timeout, "statement timeout is not supported by sqlite, ignored");

        Ok(())
    }

    async fn try_lock(_conn: &mut SqliteConnection, _key: i64) -> Result<bool> {
        Ok(true)
    }

    async fn unlock(_conn: &mut SqliteConnection, _key: i64) -> Result<()> {
        Ok(())
    }
}

/// Declared types as reported by sqlx for sqlite columns.
fn null_kind(declared: &str) -> Kind {
    match declared {
        "BOOLEAN" => Kind::Bool,
        "INTEGER" => Kind::Int,
        "REAL" => Kind::Float,
        "BLOB" => Kind::Bytes,
        "DATETIME" | "DATE" => Kind::Timestamp,
        _ => Kind::Text,
    }
}

fn decode_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        if raw.is_null() {
            record.push(column.name(), Value::Null(null_kind(column.type_info().name())));
            continue;
        }

        let storage = raw.type_info().name().to_owned();
        let value = match storage.as_str() {
            "REAL" => Value::Float(row.try_get_unchecked(index)?),
            "TEXT" => Value::Text(row.try_get_unchecked(index)?),
            "BLOB" => Value::Bytes(row.try_get_unchecked(index)?),
            _ => Value::Int(row.try_get_unchecked(index)?),
        };

        record.push(column.name(), value);
    }

    Ok(record)
}

struct TableColumn {
    name: String,
    not_null: bool,
    default: Option<String>,
}

/// SQLite has no `ALTER COLUMN`, the table is recreated inside a savepoint
/// from its original `CREATE TABLE` statement with only the column
/// definition edited.
///
/// `PRAGMA foreign_keys` cannot change inside a transaction, so foreign key
/// checks are deferred instead: dropping the table leaves the child rows
/// dangling until the rows are copied back under the same table name.
async fn rebuild(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    edit: Edit<'_>,
) -> Result<()> {
    let columns = table_columns(conn, table).await?;
    let Some(target) = columns.iter().find(|c| c.name == column) else {
        return Err(SqlError::NoSuchColumn {
            table: table.to_owned(),
            column: column.to_owned(),
        });
    };

    match edit {
        Edit::Default(default) => {
            if target.default.as_deref().map(normalize_default) == Some(normalize_default(default))
            {
                tracing::debug!(table, column, "default already set, rebuild skipped");
                return Ok(());
            }
        }
        Edit::NotNull => {
            if target.not_null {
                tracing::debug!(table, column, "column already not null, rebuild skipped");
                return Ok(());
            }
        }
    }

    let actions = sqlx::query_as::<_, (String, String)>(
        r#"SELECT m.name, f.on_delete
        FROM sqlite_master m, pragma_foreign_key_list(m.name) f
        WHERE m.type = 'table' AND f."table" = $1 COLLATE NOCASE AND f.on_delete <> 'NO ACTION'"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    if let Some((child, action)) = actions.first() {
        return Err(SqlError::Rebuild {
            table: table.to_owned(),
            reason: format!("`{child}` references it with ON DELETE {action}"),
        });
    }

    let original = sqlx::query_scalar::<_, String>(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = $1",
    )
    .bind(table)
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or_default();

    let definition =
        ddl::rewrite_column(&original, column, edit).ok_or_else(|| SqlError::Rebuild {
            table: table.to_owned(),
            reason: format!("definition of `{column}` not found in `{original}`"),
        })?;
    let dependents = sqlx::query_scalar::<_, String>(
        r#"SELECT sql FROM sqlite_master
        WHERE tbl_name = $1 AND type IN ('index', 'trigger') AND sql IS NOT NULL
        ORDER BY type, name"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    let quoted = quote_ident(table);
    let copy = quote_ident(&format!("patchkit_rebuild_{table}"));
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut script = vec![
        "SAVEPOINT patchkit_rebuild".to_owned(),
        "PRAGMA defer_foreign_keys = ON".to_owned(),
        format!("CREATE TEMP TABLE {copy} AS SELECT * FROM {quoted}"),
        format!("DROP TABLE {quoted}"),
        definition,
        format!("INSERT INTO {quoted} ({names}) SELECT {names} FROM {copy}"),
        format!("DROP TABLE {copy}"),
    ];
    script.extend(dependents);
    script.push("RELEASE patchkit_rebuild".to_owned());

    tracing::debug!(table, column, "rebuilding sqlite table");

    let script = format!("{};", script.join(";\n"));
    if let Err(err) = sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&script)).await {
        sqlx::Executor::execute(
            &mut *conn,
            sqlx::raw_sql("ROLLBACK TO patchkit_rebuild; RELEASE patchkit_rebuild;"),
        )
        .await?;

        return Err(err.into());
    }

    Ok(())
}

async fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<TableColumn>> {
    let rows = sqlx::query_as::<_, (String, i64, Option<String>)>(
        r#"SELECT name, "notnull", dflt_value FROM pragma_table_info($1) ORDER BY cid"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, not_null, default)| TableColumn {
            name,
            not_null: not_null != 0,
            default,
        })
        .collect())
}

fn normalize_default(default: &str) -> String {
    let mut value = default.trim();

    while let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        value = inner.trim();
    }

    value.to_lowercase()
}
