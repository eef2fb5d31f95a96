use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_query_binder::SqlxValues;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use super::{Backend, ColumnInfo};
use crate::dialect::quote_ident;
use crate::{Dialect, Kind, Record, Result, Value};

#[async_trait::async_trait]
impl Backend for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
    const ADVISORY_LOCKS: bool = true;

    async fn execute(conn: &mut PgConnection, sql: &str, values: SqlxValues) -> Result<u64> {
        let res = sqlx::query_with::<Postgres, _>(sql, values)
            .execute(&mut *conn)
            .await?;

        Ok(res.rows_affected())
    }

    async fn fetch_all(
        conn: &mut PgConnection,
        sql: &str,
        values: SqlxValues,
    ) -> Result<Vec<Record>> {
        let rows = sqlx::query_with::<Postgres, _>(sql, values)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn execute_script(conn: &mut PgConnection, sql: &str) -> Result<()> {
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql)).await?;

        Ok(())
    }

    async fn next_id(conn: &mut PgConnection, table: &str, column: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT nextval(pg_get_serial_sequence($1, $2))",
        )
        .bind(quote_ident(table))
        .bind(column)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    async fn column_info(
        conn: &mut PgConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnInfo>> {
        let row = sqlx::query_as::<_, (String, Option<String>)>(
            r#"SELECT is_nullable::text, column_default::text
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2"#,
        )
        .bind(table)
        .bind(column)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|(nullable, default)| ColumnInfo {
            not_null: nullable == "NO",
            default,
        }))
    }

    async fn set_default(
        conn: &mut PgConnection,
        table: &str,
        column: &str,
        default: &str,
    ) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {default}",
            quote_ident(table),
            quote_ident(column)
        );

        Self::execute_script(conn, &sql).await
    }

    async fn set_not_null(conn: &mut PgConnection, table: &str, column: &str) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
            quote_ident(table),
            quote_ident(column)
        );

        Self::execute_script(conn, &sql).await
    }

    async fn statement_timeout(conn: &mut PgConnection, timeout: Duration) -> Result<()> {
        let sql = format!("SET LOCAL statement_timeout = {}", timeout.as_millis());

        Self::execute_script(conn, &sql).await
    }

    async fn try_lock(conn: &mut PgConnection, key: i64) -> Result<bool> {
        let locked = sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;

        Ok(locked)
    }

    async fn unlock(conn: &mut PgConnection, key: i64) -> Result<()> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(key)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

fn null_kind(type_name: &str) -> Kind {
    match type_name {
        "BOOL" => Kind::Bool,
        "INT2" | "INT4" | "INT8" => Kind::Int,
        "FLOAT4" | "FLOAT8" => Kind::Float,
        "BYTEA" => Kind::Bytes,
        "UUID" => Kind::Uuid,
        "TIMESTAMPTZ" | "TIMESTAMP" | "DATE" => Kind::Timestamp,
        _ => Kind::Text,
    }
}

fn decode_row(row: &PgRow) -> Result<Record> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let type_name = column.type_info().name();
        let raw = row.try_get_raw(index)?;

        if raw.is_null() {
            record.push(column.name(), Value::Null(null_kind(type_name)));
            continue;
        }

        let value = match type_name {
            "BOOL" => Value::Bool(row.try_get(index)?),
            "INT2" => Value::Int(row.try_get::<i16, _>(index)?.into()),
            "INT4" => Value::Int(row.try_get::<i32, _>(index)?.into()),
            "INT8" => Value::Int(row.try_get(index)?),
            "FLOAT4" => Value::Float(row.try_get::<f32, _>(index)?.into()),
            "FLOAT8" => Value::Float(row.try_get(index)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::Text(row.try_get(index)?),
            "BYTEA" => Value::Bytes(row.try_get(index)?),
            "UUID" => Value::Uuid(row.try_get::<Uuid, _>(index)?),
            "TIMESTAMPTZ" => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?),
            "TIMESTAMP" => Value::Timestamp(row.try_get::<NaiveDateTime, _>(index)?.and_utc()),
            "DATE" => Value::Timestamp(
                row.try_get::<NaiveDate, _>(index)?
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default()
                    .and_utc(),
            ),
            "VOID" => Value::Null(Kind::Text),
            _ => {
                let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;

                Value::Bytes(bytes.to_vec())
            }
        };

        record.push(column.name(), value);
    }

    Ok(record)
}
