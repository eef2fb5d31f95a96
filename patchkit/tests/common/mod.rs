#![allow(dead_code)]

use patchkit::{Loader, PatchKey, Runner};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};

pub async fn create_sqlite_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    Ok(pool)
}

/// A database carrying `schema` and recorded at `version`.
pub async fn create_database(schema: &str, version: &str) -> anyhow::Result<SqlitePool> {
    let pool = create_sqlite_pool().await?;

    if !schema.is_empty() {
        sqlx::raw_sql(schema).execute(&pool).await?;
    }

    Runner::new(pool.clone(), Loader::<Sqlite>::new())
        .initialize(version.parse::<PatchKey>()?)
        .await?;

    Ok(pool)
}

pub async fn recorded_version(pool: &SqlitePool) -> anyhow::Result<String> {
    let version =
        sqlx::query_scalar("SELECT field_value FROM parameter_data WHERE field_name = 'SCHEMA_VERSION'")
            .fetch_one(pool)
            .await?;

    Ok(version)
}

pub async fn count(pool: &SqlitePool, table: &str) -> anyhow::Result<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> anyhow::Result<bool> {
    let found: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info($1) WHERE name = $2")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;

    Ok(found == 1)
}

/// Generation 1 audit table and the retail tables the scenarios patch.
pub const RETAIL_V1: &str = r#"
CREATE TABLE transaction_entry (
    id INTEGER PRIMARY KEY,
    te_time DATETIME NOT NULL,
    user_id INTEGER,
    station_id INTEGER
);
CREATE TABLE sellable (
    id INTEGER PRIMARY KEY,
    te_created_id INTEGER UNIQUE REFERENCES transaction_entry (id),
    te_modified_id INTEGER UNIQUE REFERENCES transaction_entry (id),
    description TEXT
);
CREATE TABLE product (
    id INTEGER PRIMARY KEY,
    te_created_id INTEGER UNIQUE REFERENCES transaction_entry (id),
    te_modified_id INTEGER UNIQUE REFERENCES transaction_entry (id),
    sellable_id INTEGER REFERENCES sellable (id),
    image BLOB,
    full_image BLOB
);
"#;

/// Audit table of `generation` with a `city_location` table using it.
pub fn city_schema(generation: u8) -> &'static str {
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
                te_created_id INTEGER UNIQUE REFERENCES transaction_entry (id),
                te_modified_id INTEGER UNIQUE REFERENCES transaction_entry (id),
                city TEXT,
                state TEXT
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
                te_id INTEGER UNIQUE REFERENCES transaction_entry (id),
                city TEXT,
                state TEXT
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
                te_id BLOB NOT NULL UNIQUE REFERENCES transaction_entry (id),
                city TEXT,
                state TEXT
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
                te_id BLOB NOT NULL UNIQUE REFERENCES transaction_entry (id),
                city TEXT,
                state TEXT
            );
            "#
        }
    }
}

/// Generation 2 audit table with a `note` table using it.
pub const NOTE_V2: &str = r#"
CREATE TABLE transaction_entry (
    id INTEGER PRIMARY KEY,
    te_time DATETIME NOT NULL,
    user_id INTEGER,
    station_id INTEGER,
    dirty BOOLEAN NOT NULL DEFAULT 0
);
CREATE TABLE note (
    id INTEGER PRIMARY KEY,
    te_id INTEGER UNIQUE REFERENCES transaction_entry (id),
    body TEXT NOT NULL
);
"#;
