mod common;

use patchkit_sql::{Backend, BatchDefault, DefaultReport, SqlError};
use sqlx::Sqlite;

use common::{create_company, create_sqlite_pool};

#[tokio::test]
async fn fills_a_populated_table_in_batches() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 10_000).await?;

    sqlx::query("ALTER TABLE company ADD COLUMN has_kps_enabled BOOLEAN")
        .execute(&pool)
        .await?;

    let mut conn = pool.acquire().await?;
    let report = BatchDefault::new("company", "has_kps_enabled", false)
        .batch_size(1000)
        .run::<Sqlite>(&mut *conn)
        .await?;
    drop(conn);

    assert_eq!(
        report,
        DefaultReport {
            batches: 10,
            rows: 10_000
        }
    );

    let nulls: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM company WHERE has_kps_enabled IS NULL")
            .fetch_one(&pool)
            .await?;
    assert_eq!(nulls, 0);

    sqlx::query("INSERT INTO company (id, name, code) VALUES (10001, 'new', 'N1')")
        .execute(&pool)
        .await?;
    let enabled: bool = sqlx::query_scalar("SELECT has_kps_enabled FROM company WHERE id = 10001")
        .fetch_one(&pool)
        .await?;
    assert!(!enabled);

    let explicit_null = sqlx::query(
        "INSERT INTO company (id, name, code, has_kps_enabled) VALUES (10002, 'null', 'N2', NULL)",
    )
    .execute(&pool)
    .await;
    assert!(explicit_null.is_err());

    Ok(())
}

#[tokio::test]
async fn last_batch_may_be_partial() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 2_500).await?;

    sqlx::query("ALTER TABLE company ADD COLUMN rating INTEGER")
        .execute(&pool)
        .await?;

    let mut conn = pool.acquire().await?;
    let report = BatchDefault::new("company", "rating", 3)
        .run::<Sqlite>(&mut *conn)
        .await?;

    assert_eq!(report.batches, 3);
    assert_eq!(report.rows, 2_500);

    let total: i64 = sqlx::query_scalar("SELECT SUM(rating) FROM company")
        .fetch_one(&mut *conn)
        .await?;
    assert_eq!(total, 7_500);

    Ok(())
}

#[tokio::test]
async fn second_run_is_a_no_op() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 300).await?;

    sqlx::query("ALTER TABLE company ADD COLUMN status TEXT")
        .execute(&pool)
        .await?;

    let mut conn = pool.acquire().await?;
    let job = BatchDefault::new("company", "status", "active").batch_size(100);

    let first = job.run::<Sqlite>(&mut *conn).await?;
    let second = job.run::<Sqlite>(&mut *conn).await?;

    assert_eq!(first.batches, 3);
    assert_eq!(second, DefaultReport::default());

    let info = Sqlite::column_info(&mut *conn, "company", "status")
        .await?
        .expect("status column");
    assert!(info.not_null);
    assert_eq!(info.default.as_deref(), Some("'active'"));

    Ok(())
}

#[tokio::test]
async fn rebuild_keeps_constraints_indexes_and_references() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 50).await?;

    sqlx::raw_sql(
        r#"
        INSERT INTO store (id, company_id, name) VALUES (1, 7, 'north'), (2, 7, 'south');
        ALTER TABLE company ADD COLUMN archived BOOLEAN;
        "#,
    )
    .execute(&pool)
    .await?;

    let mut tx = pool.begin().await?;
    BatchDefault::new("company", "archived", false)
        .batch_size(20)
        .run::<Sqlite>(&mut *tx)
        .await?;
    tx.commit().await?;

    let index: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'ix_company_name'",
    )
    .fetch_optional(&pool)
    .await?;
    assert_eq!(index.as_deref(), Some("ix_company_name"));

    let duplicate_code =
        sqlx::query("INSERT INTO company (id, name, code) VALUES (100, 'dup', 'C1')")
            .execute(&pool)
            .await;
    assert!(duplicate_code.is_err());

    let missing_company =
        sqlx::query("INSERT INTO store (id, company_id, name) VALUES (3, 999, 'ghost')")
            .execute(&pool)
            .await;
    assert!(missing_company.is_err());

    let stores: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM store JOIN company ON company.id = store.company_id",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(stores, 2);

    let created_at: Option<String> =
        sqlx::query_scalar("SELECT dflt_value FROM pragma_table_info('company') WHERE name = 'created_at'")
            .fetch_one(&pool)
            .await?;
    assert_eq!(created_at.as_deref(), Some("CURRENT_TIMESTAMP"));

    Ok(())
}

#[tokio::test]
async fn rebuild_keeps_checks_collations_and_generated_columns() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;

    sqlx::raw_sql(
        r#"
        CREATE TABLE payment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            method TEXT COLLATE NOCASE NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            doubled REAL GENERATED ALWAYS AS (amount * 2) VIRTUAL,
            CONSTRAINT method_known CHECK (method IN ('cash', 'card'))
        );
        INSERT INTO payment (method, amount) VALUES ('cash', 10), ('card', 25.5), ('cash', 3);
        ALTER TABLE payment ADD COLUMN settled BOOLEAN;
        "#,
    )
    .execute(&pool)
    .await?;

    let mut conn = pool.acquire().await?;
    let report = BatchDefault::new("payment", "settled", false)
        .batch_size(2)
        .run::<Sqlite>(&mut *conn)
        .await?;
    assert_eq!(report.rows, 3);

    let info = Sqlite::column_info(&mut *conn, "payment", "settled")
        .await?
        .expect("settled column");
    assert!(info.not_null);
    drop(conn);

    let negative = sqlx::query("INSERT INTO payment (method, amount) VALUES ('cash', -1)")
        .execute(&pool)
        .await;
    assert!(negative.is_err());

    let unknown = sqlx::query("INSERT INTO payment (method, amount) VALUES ('cheque', 1)")
        .execute(&pool)
        .await;
    assert!(unknown.is_err());

    let cash: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE method = 'CASH'")
        .fetch_one(&pool)
        .await?;
    assert_eq!(cash, 2);

    let doubled: f64 = sqlx::query_scalar("SELECT doubled FROM payment WHERE id = 1")
        .fetch_one(&pool)
        .await?;
    assert_eq!(doubled, 20.0);

    let next: i64 =
        sqlx::query_scalar("INSERT INTO payment (method, amount) VALUES ('card', 1) RETURNING id")
            .fetch_one(&pool)
            .await?;
    assert_eq!(next, 4);

    Ok(())
}

#[tokio::test]
async fn cascading_references_are_refused() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 5).await?;

    sqlx::raw_sql(
        r#"
        CREATE TABLE contact (
            id INTEGER PRIMARY KEY,
            company_id INTEGER REFERENCES company (id) ON DELETE CASCADE
        );
        INSERT INTO contact (id, company_id) VALUES (1, 1);
        ALTER TABLE company ADD COLUMN archived BOOLEAN;
        "#,
    )
    .execute(&pool)
    .await?;

    let mut conn = pool.acquire().await?;
    let err = BatchDefault::new("company", "archived", false)
        .run::<Sqlite>(&mut *conn)
        .await
        .unwrap_err();

    assert!(matches!(err, SqlError::Rebuild { ref table, .. } if table == "company"));

    let contacts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact")
        .fetch_one(&mut *conn)
        .await?;
    assert_eq!(contacts, 1);

    Ok(())
}

#[tokio::test]
async fn missing_table_or_column_fails_immediately() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 1).await?;

    let mut conn = pool.acquire().await?;

    let err = BatchDefault::new("company", "nope", 1)
        .run::<Sqlite>(&mut *conn)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::NoSuchColumn { ref column, .. } if column == "nope"));

    let err = BatchDefault::new("nowhere", "id", 1)
        .run::<Sqlite>(&mut *conn)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::NoSuchColumn { ref table, .. } if table == "nowhere"));

    Ok(())
}

#[tokio::test]
async fn zero_batch_size_and_null_default_are_rejected() -> anyhow::Result<()> {
    let pool = create_sqlite_pool().await?;
    create_company(&pool, 1).await?;

    let mut conn = pool.acquire().await?;

    let err = BatchDefault::new("company", "name", "x")
        .batch_size(0)
        .run::<Sqlite>(&mut *conn)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::InvalidBatchSize));

    let err = BatchDefault::new("company", "name", None::<String>)
        .run::<Sqlite>(&mut *conn)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::NullDefault));

    Ok(())
}
