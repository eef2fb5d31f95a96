use patchkit_snapshot::{Session, SessionOptions, LATEST_GENERATION};
use patchkit_sql::{Backend, SqlError};
use sea_query::{ColumnDef, Expr, Iden, Query, Table};
use sqlx::pool::PoolConnection;
use sqlx::Pool;

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::loader::Loader;
use crate::patch::{PatchBody, PatchDescriptor, PatchKey};

#[derive(Iden)]
enum ParameterData {
    Table,
    FieldName,
    FieldValue,
}

/// Where a database stands relative to the available patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub current: PatchKey,
    pub latest: Option<PatchKey>,
    pub pending: Vec<PatchDescriptor>,
}

impl Status {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Applies pending patches, one transaction per patch.
///
/// ```no_run
/// # async fn run(pool: sqlx::SqlitePool) -> patchkit::Result<()> {
/// use patchkit::{Loader, Runner};
///
/// let loader = Loader::new().directory("sql");
/// let applied = Runner::new(pool, loader).apply_all().await?;
/// # Ok(())
/// # }
/// ```
pub struct Runner<DB: Backend> {
    pool: Pool<DB>,
    loader: Loader<DB>,
    config: Config,
}

impl<DB: Backend> Runner<DB> {
    pub fn new(pool: Pool<DB>, loader: Loader<DB>) -> Self {
        Self {
            pool,
            loader,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn loader(&self) -> &Loader<DB> {
        &self.loader
    }

    /// Creates the version table when missing and records `key` unless a
    /// version is already recorded.
    pub async fn initialize(&self, key: PatchKey) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let statement = Table::create()
            .table(ParameterData::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(ParameterData::FieldName)
                    .string()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(ParameterData::FieldValue).text().not_null())
            .to_owned();

        DB::execute_script(&mut *tx, &DB::DIALECT.schema(&statement)).await?;

        if self.read_version(&mut *tx).await?.is_none() {
            let mut statement = Query::insert();
            statement
                .into_table(ParameterData::Table)
                .columns([ParameterData::FieldName, ParameterData::FieldValue])
                .values([
                    self.config.version_field.clone().into(),
                    key.to_string().into(),
                ])
                .map_err(SqlError::from)?;

            DB::run(&mut *tx, &statement).await?;

            tracing::info!(%key, "schema version initialized");
        }

        tx.commit().await?;

        Ok(())
    }

    pub async fn current_version(&self) -> Result<PatchKey> {
        let mut conn = self.pool.acquire().await?;

        self.read_version(&mut *conn)
            .await?
            .ok_or(MigrateError::Uninitialized)
    }

    /// Patches newer than the recorded version, in application order.
    pub async fn pending(&self) -> Result<Vec<PatchDescriptor>> {
        let current = self.current_version().await?;

        self.pending_after(current).await
    }

    pub async fn status(&self) -> Result<Status> {
        let current = self.current_version().await?;
        let descriptors = self.loader.enumerate().await?;
        let latest = descriptors.last().map(|descriptor| descriptor.key);
        let pending = self.pending_after(current).await?;

        Ok(Status {
            current,
            latest,
            pending,
        })
    }

    /// Applies one patch. It must be newer than the recorded version.
    pub async fn apply_one(&self, descriptor: &PatchDescriptor) -> Result<()> {
        let current = self.current_version().await?;

        if descriptor.key <= current {
            return Err(MigrateError::OutOfOrder {
                key: descriptor.key,
                current,
            });
        }

        self.apply(descriptor).await
    }

    /// Applies every pending patch in order and returns how many were
    /// applied. Stops at the first failure; patches committed before it stay.
    pub async fn apply_all(&self) -> Result<usize> {
        let mut lock = self.lock().await?;
        let applied = self.apply_pending().await;

        if let Some((key, conn)) = lock.as_mut() {
            if let Err(err) = DB::unlock(&mut **conn, *key).await {
                tracing::warn!(key = *key, error = %err, "failed to release advisory lock");
            }
        }

        applied
    }

    async fn apply_pending(&self) -> Result<usize> {
        let pending = self.pending().await?;
        let total = pending.len();

        if total == 0 {
            tracing::debug!("schema is up to date");
            return Ok(0);
        }

        for (applied, descriptor) in pending.iter().enumerate() {
            if let Err(err) = self.apply(descriptor).await {
                tracing::warn!(
                    patch = %descriptor.key,
                    applied,
                    remaining = total - applied,
                    "halting upgrade"
                );

                return Err(err);
            }
        }

        Ok(total)
    }

    async fn pending_after(&self, current: PatchKey) -> Result<Vec<PatchDescriptor>> {
        let descriptors = self.loader.enumerate().await?;

        if let Some(latest) = descriptors.last() {
            if current > latest.key {
                return Err(MigrateError::VersionRegressed {
                    recorded: current,
                    latest: latest.key,
                });
            }
        }

        Ok(descriptors
            .into_iter()
            .filter(|descriptor| descriptor.key > current)
            .collect())
    }

    async fn lock(&self) -> Result<Option<(i64, PoolConnection<DB>)>> {
        let Some(key) = self.config.advisory_lock else {
            return Ok(None);
        };

        if !DB::ADVISORY_LOCKS {
            tracing::debug!(key, "backend has no advisory locks, running unlocked");
            return Ok(None);
        }

        let mut conn = self.pool.acquire().await?;
        if !DB::try_lock(&mut *conn, key).await? {
            return Err(MigrateError::Locked(key));
        }

        Ok(Some((key, conn)))
    }

    async fn read_version(&self, conn: &mut DB::Connection) -> Result<Option<PatchKey>> {
        let statement = Query::select()
            .column(ParameterData::FieldValue)
            .from(ParameterData::Table)
            .and_where(Expr::col(ParameterData::FieldName).eq(self.config.version_field.as_str()))
            .to_owned();

        let Some(record) = DB::query(conn, &statement).await?.into_iter().next() else {
            return Ok(None);
        };

        let value = record.first::<String>()?;
        let key = value
            .parse()
            .map_err(|_| MigrateError::MalformedVersion(value.clone()))?;

        Ok(Some(key))
    }

    async fn apply(&self, descriptor: &PatchDescriptor) -> Result<()> {
        let body = self.loader.load(descriptor).await?;
        let generation = match &body {
            PatchBody::Code(patch) => patch.generation(),
            PatchBody::Sql(_) => LATEST_GENERATION,
        };

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| failed(descriptor, err.into(), true))?;

        let options = SessionOptions::default()
            .generation(generation)
            .context(self.config.context)
            .batch_size(self.config.batch_size);
        let mut session = Session::new(tx, options);

        let outcome = self.run(&mut session, descriptor, body).await;

        if let Some(violation) = session.take_violation() {
            if let Err(err) = session.rollback().await {
                tracing::error!(patch = %descriptor.key, error = %err, "rollback failed");
            }

            tracing::error!(
                patch = %descriptor.key,
                snapshot = %violation.snapshot,
                "snapshot contract violated"
            );

            return Err(MigrateError::SnapshotContractViolation {
                descriptor: descriptor.clone(),
                snapshot: violation.snapshot,
                snapshot_generation: violation.snapshot_generation,
                patch_generation: violation.session_generation,
            });
        }

        if let Err(cause) = outcome {
            let rolled_back = match session.rollback().await {
                Ok(()) => true,
                Err(err) => {
                    tracing::error!(patch = %descriptor.key, error = %err, "rollback failed");
                    false
                }
            };

            tracing::error!(patch = %descriptor.key, error = %format!("{cause:#}"), "patch failed");

            return Err(failed(descriptor, cause, rolled_back));
        }

        if let Err(err) = session.commit().await {
            tracing::error!(patch = %descriptor.key, error = %err, "commit failed");

            return Err(failed(descriptor, err.into(), false));
        }

        tracing::info!(patch = %descriptor.key, kind = %descriptor.kind, "patch applied");

        Ok(())
    }

    async fn run(
        &self,
        session: &mut Session<DB>,
        descriptor: &PatchDescriptor,
        body: PatchBody<'_, DB>,
    ) -> anyhow::Result<()> {
        if let Some(timeout) = self.config.statement_timeout {
            DB::statement_timeout(session.connection().await?, timeout).await?;
        }

        match body {
            PatchBody::Sql(script) => session.execute_script(&script).await?,
            PatchBody::Code(patch) => {
                patch.apply_patch(session).await?;
                session.flush().await?;
            }
        }

        let statement = Query::update()
            .table(ParameterData::Table)
            .value(ParameterData::FieldValue, descriptor.key.to_string())
            .and_where(Expr::col(ParameterData::FieldName).eq(self.config.version_field.as_str()))
            .to_owned();

        let rows = session.execute(&statement).await?;
        if rows != 1 {
            anyhow::bail!("expected one schema version row, found {rows}");
        }

        Ok(())
    }
}

fn failed(descriptor: &PatchDescriptor, cause: anyhow::Error, rolled_back: bool) -> MigrateError {
    MigrateError::PatchExecutionFailed {
        descriptor: descriptor.clone(),
        cause,
        rolled_back,
    }
}
