#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn create_sqlite_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    Ok(pool)
}

/// `company` filled with `rows` rows, plus an empty `store` table referencing it.
pub async fn create_company(pool: &SqlitePool, rows: i64) -> anyhow::Result<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE company (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX ix_company_name ON company (name);
        CREATE TABLE store (
            id INTEGER PRIMARY KEY,
            company_id INTEGER NOT NULL REFERENCES company (id),
            name TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < $1)
        INSERT INTO company (id, name, code)
        SELECT n, 'company ' || n, 'C' || n FROM seq WHERE n <= $1
        "#,
    )
    .bind(rows)
    .execute(pool)
    .await?;

    Ok(())
}
