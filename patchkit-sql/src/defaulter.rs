use sea_query::{Alias, Expr, Query};

use crate::{Backend, Result, SqlError, Value};

/// Rows updated per batch when none is given.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Installs a not null column with a default on a populated table.
///
/// The default is set first so new rows get it, existing rows are filled in
/// batches of at most `batch_size` keys, then the column is made not null.
/// Each batch selects fresh candidates, so only the rows of the current
/// batch are locked and rows inserted concurrently with an explicit null are
/// picked up by a later batch.
///
/// ```no_run
/// # async fn run(conn: &mut sqlx::SqliteConnection) -> patchkit_sql::Result<()> {
/// use patchkit_sql::BatchDefault;
///
/// let report = BatchDefault::new("company", "has_kps_enabled", false)
///     .batch_size(500)
///     .run::<sqlx::Sqlite>(conn)
///     .await?;
///
/// println!("{} rows in {} batches", report.rows, report.batches);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BatchDefault {
    table: String,
    column: String,
    default: Value,
    key: String,
    batch_size: usize,
}

/// Outcome of a [`BatchDefault`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultReport {
    pub batches: usize,
    pub rows: u64,
}

impl BatchDefault {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            default: default.into(),
            key: "id".to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Primary key column used to address rows, `id` by default.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub async fn run<DB: Backend>(&self, conn: &mut DB::Connection) -> Result<DefaultReport> {
        if self.batch_size == 0 {
            return Err(SqlError::InvalidBatchSize);
        }

        if self.default.is_null() {
            return Err(SqlError::NullDefault);
        }

        if DB::column_info(conn, &self.table, &self.column)
            .await?
            .is_none()
        {
            return Err(SqlError::NoSuchColumn {
                table: self.table.clone(),
                column: self.column.clone(),
            });
        }

        let default = DB::DIALECT.literal(&self.default);
        DB::set_default(conn, &self.table, &self.column, &default).await?;

        let mut report = DefaultReport::default();

        loop {
            let statement = Query::select()
                .column(Alias::new(&self.key))
                .from(Alias::new(&self.table))
                .and_where(Expr::col(Alias::new(&self.column)).is_null())
                .limit(self.batch_size as u64)
                .to_owned();

            let keys = DB::query(conn, &statement)
                .await?
                .into_iter()
                .map(|record| record.get::<Value>(&self.key).map(sea_query::Value::from))
                .collect::<Result<Vec<_>>>()?;

            if keys.is_empty() {
                break;
            }

            let statement = Query::update()
                .table(Alias::new(&self.table))
                .value(
                    Alias::new(&self.column),
                    sea_query::Value::from(self.default.clone()),
                )
                .and_where(Expr::col(Alias::new(&self.key)).is_in(keys))
                .to_owned();

            let rows = DB::run(conn, &statement).await?;

            report.batches += 1;
            report.rows += rows;

            tracing::debug!(
                table = %self.table,
                column = %self.column,
                batch = report.batches,
                rows,
                "default batch applied"
            );
        }

        DB::set_not_null(conn, &self.table, &self.column).await?;

        Ok(report)
    }
}
