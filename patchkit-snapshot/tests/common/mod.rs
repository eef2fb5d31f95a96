#![allow(dead_code)]

use patchkit_snapshot::{Context, Session, SessionOptions};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};

pub async fn create_sqlite_pool(generation: u8) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::raw_sql(schema(generation)).execute(&pool).await?;

    Ok(pool)
}

pub async fn begin(
    pool: &SqlitePool,
    generation: u8,
    context: Context,
) -> anyhow::Result<Session<Sqlite>> {
    let options = SessionOptions::default()
        .generation(generation)
        .context(context);

    Ok(Session::begin(pool, options).await?)
}

pub async fn count(pool: &SqlitePool, table: &str) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;

    Ok(count)
}

fn schema(generation: u8) -> &'static str {
    match generation {
        1 => {
            r#"
            CREATE TABLE transaction_entry (
                id INTEGER PRIMARY KEY,
                te_time DATETIME NOT NULL,
                user_id INTEGER,
                station_id INTEGER
            );
            CREATE TABLE city_location (
                id INTEGER PRIMARY KEY,
                te_created_id INTEGER NOT NULL REFERENCES transaction_entry (id),
                te_modified_id INTEGER NOT NULL REFERENCES transaction_entry (id),
                city TEXT NOT NULL,
                state TEXT,
                country TEXT NOT NULL DEFAULT 'Brazil'
            );
            "#
        }
        2 => {
            r#"
            CREATE TABLE transaction_entry (
                id INTEGER PRIMARY KEY,
                te_time DATETIME NOT NULL,
                user_id INTEGER,
                station_id INTEGER,
                dirty BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE TABLE city_location (
                id INTEGER PRIMARY KEY,
                te_id INTEGER REFERENCES transaction_entry (id),
                city TEXT NOT NULL,
                state TEXT,
                country TEXT NOT NULL DEFAULT 'Brazil'
            );
            "#
        }
        3 => {
            r#"
            CREATE TABLE transaction_entry (
                id BLOB PRIMARY KEY,
                te_time DATETIME NOT NULL,
                user_id BLOB,
                station_id BLOB,
                dirty BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE TABLE city_location (
                id BLOB PRIMARY KEY,
                te_id BLOB NOT NULL REFERENCES transaction_entry (id),
                city TEXT NOT NULL,
                state TEXT,
                country TEXT NOT NULL DEFAULT 'Brazil'
            );
            "#
        }
        _ => {
            r#"
            CREATE TABLE transaction_entry (
                id BLOB PRIMARY KEY,
                te_time DATETIME NOT NULL,
                dirty BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE TABLE city_location (
                id BLOB PRIMARY KEY,
                te_id BLOB NOT NULL REFERENCES transaction_entry (id),
                city TEXT NOT NULL,
                state TEXT,
                country TEXT NOT NULL DEFAULT 'Brazil'
            );
            "#
        }
    }
}
