use std::collections::HashMap;

use chrono::{DateTime, Utc};
use patchkit_sql::{
    Backend, BatchDefault, DefaultReport, FromValue, Key, Record, SqlError, Value,
    DEFAULT_BATCH_SIZE,
};
use sea_query::{
    Alias, Expr, Func, Iden, InsertStatement, IntoIden, Query, SchemaStatementBuilder, SimpleExpr,
};
use sea_query_binder::{SqlxBinder, SqlxValues};
use sqlx::{Connection, Pool, Transaction};
use uuid::Uuid;

use crate::error::{Lifecycle, Result, SnapshotError};
use crate::find::Find;
use crate::generation::{
    AuditEntry, AuditLayout, Context, Generation, HookContext, KeyKind, Shape, TRANSACTION_ENTRY,
};
use crate::plan::{self, Change, Columns, Step};
use crate::snapshot::{IdOf, Loaded, Snapshot};

/// Newest generation known to this crate.
pub const LATEST_GENERATION: u8 = 4;

#[derive(Iden)]
enum TransactionEntry {
    Table,
    Id,
}

/// Pending state of a tracked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Updated,
    Deleted,
    Clean,
}

/// Settings of a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Highest snapshot generation the session accepts.
    pub generation: u8,
    pub context: Context,
    /// Batch size of [`Session::default_column`].
    pub batch_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            generation: LATEST_GENERATION,
            context: Context::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SessionOptions {
    pub fn generation(mut self, generation: u8) -> Self {
        self.generation = generation;
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// A snapshot of a newer generation than the session allows was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub snapshot: String,
    pub snapshot_generation: u8,
    pub session_generation: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuditRef {
    CreatedModified { created: Key, modified: Key },
    Single(Key),
}

impl AuditRef {
    fn read(shape: Shape, record: &Record) -> patchkit_sql::Result<Option<Self>> {
        match shape.audit {
            AuditLayout::CreatedModified => {
                let created = record.get::<Option<Key>>("te_created_id")?;
                let modified = record.get::<Option<Key>>("te_modified_id")?;

                Ok(created
                    .zip(modified)
                    .map(|(created, modified)| AuditRef::CreatedModified { created, modified }))
            }
            AuditLayout::Single { .. } => {
                Ok(record.get::<Option<Key>>("te_id")?.map(AuditRef::Single))
            }
        }
    }

    fn ids(&self) -> Vec<Key> {
        match *self {
            AuditRef::CreatedModified { created, modified } => vec![created, modified],
            AuditRef::Single(id) => vec![id],
        }
    }

    /// Entry rewritten when the row is updated.
    fn touched(&self) -> Key {
        match *self {
            AuditRef::CreatedModified { modified, .. } => modified,
            AuditRef::Single(id) => id,
        }
    }

    fn columns(&self) -> Columns {
        match *self {
            AuditRef::CreatedModified { created, modified } => vec![
                ("te_created_id", created.into()),
                ("te_modified_id", modified.into()),
            ],
            AuditRef::Single(id) => vec![("te_id", id.into())],
        }
    }
}

type HookRunner = fn(Lifecycle, &[(&'static str, Value)], &HookContext) -> Result<Option<Columns>>;

fn run_hook<T: Snapshot>(
    event: Lifecycle,
    values: &[(&'static str, Value)],
    context: &HookContext,
) -> Result<Option<Columns>> {
    let Some(hook) = T::hooks().get(event) else {
        return Ok(None);
    };

    let record = values.iter().cloned().collect::<Record>();
    let mut row = T::decode(&record)?;

    hook(&mut row, context).map_err(|source| SnapshotError::Hook {
        table: T::TABLE,
        hook: event,
        source,
    })?;

    Ok(Some(row.encode()))
}

struct Entry {
    table: &'static str,
    key: Key,
    shape: Shape,
    audit: Option<AuditRef>,
    persisted: Columns,
    current: Columns,
    /// Values as last handed to or saved by the caller.
    baseline: Columns,
    status: Status,
    /// Position of the pending change among the changes of the session.
    issued: u64,
    /// Hook already applied to the pending change.
    hooked: Option<Lifecycle>,
    run_hook: HookRunner,
}

impl Entry {
    fn record(&self) -> Record {
        self.current.iter().cloned().collect()
    }

    /// Takes the columns the caller changed since its baseline. Columns it
    /// left alone keep what hooks wrote into them.
    fn merge(&mut self, values: Columns) {
        for (column, value) in values {
            if lookup(&self.baseline, column) == Some(&value) {
                continue;
            }

            assign(&mut self.current, column, value.clone());
            assign(&mut self.baseline, column, value);
        }
    }

    fn changed(&self) -> Columns {
        self.current
            .iter()
            .filter(|(column, value)| {
                self.persisted
                    .iter()
                    .find(|(persisted, _)| persisted == column)
                    .map_or(true, |(_, persisted)| persisted != value)
            })
            .cloned()
            .collect()
    }

    fn change(&self, context: &Context, now: DateTime<Utc>) -> Option<Change> {
        match self.status {
            Status::Clean => None,
            Status::Created => {
                let mut row = vec![("id", Value::from(self.key))];
                let mut audits = Vec::new();

                if let Some(audit) = self.audit {
                    row.extend(audit.columns());
                    audits = audit
                        .ids()
                        .into_iter()
                        .map(|id| self.shape.new_entry(id, context, now))
                        .collect();
                }

                row.extend(self.current.iter().cloned());

                Some(Change::Create {
                    table: self.table,
                    row,
                    audits,
                })
            }
            Status::Updated => {
                let changed = self.changed();

                if changed.is_empty() {
                    return None;
                }

                let refresh = match self.audit {
                    Some(audit) => Some((audit.touched(), self.shape.refresh_entry(context, now))),
                    None => {
                        tracing::warn!(
                            table = self.table,
                            key = %self.key,
                            "row has no audit reference, audit entry not refreshed"
                        );
                        None
                    }
                };

                Some(Change::Update {
                    table: self.table,
                    key: self.key,
                    changed,
                    refresh,
                })
            }
            Status::Deleted => {
                if self.audit.is_none() {
                    tracing::warn!(
                        table = self.table,
                        key = %self.key,
                        "deleted row has no audit reference"
                    );
                }

                Some(Change::Delete {
                    table: self.table,
                    key: self.key,
                    audits: self.audit.map(|audit| audit.ids()).unwrap_or_default(),
                })
            }
        }
    }
}

/// Columns selected when loading a snapshot.
pub(crate) fn select_columns<T: Snapshot>() -> Vec<&'static str> {
    let shape = <T::Generation as Generation>::SHAPE;

    std::iter::once("id")
        .chain(shape.audit_references().iter().copied())
        .chain(T::COLUMNS.iter().copied())
        .collect()
}

fn lookup<'a>(columns: &'a Columns, column: &str) -> Option<&'a Value> {
    columns
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, value)| value)
}

fn assign(columns: &mut Columns, column: &'static str, value: Value) {
    match columns.iter_mut().find(|(name, _)| *name == column) {
        Some((_, slot)) => *slot = value,
        None => columns.push((column, value)),
    }
}

fn key_value(key: Key) -> sea_query::Value {
    Value::from(key).into()
}

fn insert(table: impl IntoIden + 'static, values: Columns) -> Result<InsertStatement> {
    let (columns, values): (Vec<_>, Vec<_>) = values
        .into_iter()
        .map(|(column, value)| (Alias::new(column), SimpleExpr::Value(value.into())))
        .unzip();

    let mut statement = Query::insert();
    statement.into_table(table).columns(columns);
    statement.values(values)?;

    Ok(statement)
}

fn raw_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::Null(_) => None,
        Value::Bytes(bytes) => Some(bytes),
        Value::Text(text) => Some(text.into_bytes()),
        Value::Bool(v) => Some(v.to_string().into_bytes()),
        Value::Int(v) => Some(v.to_string().into_bytes()),
        Value::Float(v) => Some(v.to_string().into_bytes()),
        Value::Uuid(v) => Some(v.as_bytes().to_vec()),
        Value::Timestamp(v) => Some(v.to_rfc3339().into_bytes()),
    }
}

/// A unit of work bound to one database transaction.
///
/// Rows loaded or created through snapshots are tracked until [`flush`],
/// which runs the lifecycle hooks, writes the business rows and keeps their
/// audit rows in step. Every query method flushes first so it sees the
/// pending writes.
///
/// [`flush`]: Session::flush
pub struct Session<DB: Backend> {
    tx: Transaction<'static, DB>,
    options: SessionOptions,
    entries: Vec<Entry>,
    issued: u64,
    high_water: HashMap<&'static str, i64>,
    violation: Option<Violation>,
}

impl<DB: Backend> Session<DB> {
    pub fn new(tx: Transaction<'static, DB>, options: SessionOptions) -> Self {
        Self {
            tx,
            options,
            entries: Vec::new(),
            issued: 0,
            high_water: HashMap::new(),
            violation: None,
        }
    }

    pub async fn begin(pool: &Pool<DB>, options: SessionOptions) -> Result<Self> {
        let tx = pool.begin().await?;

        Ok(Self::new(tx, options))
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn generation(&self) -> u8 {
        self.options.generation
    }

    /// The connection of the session transaction, after a flush.
    pub async fn connection(&mut self) -> Result<&mut DB::Connection> {
        self.flush().await?;

        Ok(&mut *self.tx)
    }

    pub async fn fetch_all<S>(&mut self, statement: &S) -> Result<Vec<Record>>
    where
        S: SqlxBinder + Sync,
    {
        self.flush().await?;

        Ok(DB::query(&mut *self.tx, statement).await?)
    }

    pub async fn fetch_optional<S>(&mut self, statement: &S) -> Result<Option<Record>>
    where
        S: SqlxBinder + Sync,
    {
        Ok(self.fetch_all(statement).await?.into_iter().next())
    }

    pub async fn execute<S>(&mut self, statement: &S) -> Result<u64>
    where
        S: SqlxBinder + Sync,
    {
        self.flush().await?;

        Ok(DB::run(&mut *self.tx, statement).await?)
    }

    /// Runs a hand written query. Parameters are numbered `$1`, `$2`, ...
    pub async fn fetch_raw(&mut self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        self.flush().await?;

        let values = SqlxValues(sea_query::Values(
            params.into_iter().map(Into::into).collect(),
        ));

        Ok(DB::fetch_all(&mut *self.tx, sql, values).await?)
    }

    /// Runs a hand written statement. Parameters are numbered `$1`, `$2`, ...
    pub async fn execute_raw(&mut self, sql: &str, params: Vec<Value>) -> Result<u64> {
        self.flush().await?;

        let values = SqlxValues(sea_query::Values(
            params.into_iter().map(Into::into).collect(),
        ));

        Ok(DB::execute(&mut *self.tx, sql, values).await?)
    }

    /// Runs `;` separated statements without parameters.
    pub async fn execute_script(&mut self, sql: &str) -> Result<()> {
        self.flush().await?;

        Ok(DB::execute_script(&mut *self.tx, sql).await?)
    }

    pub async fn execute_schema<S>(&mut self, statement: &S) -> Result<()>
    where
        S: SchemaStatementBuilder + Sync,
    {
        let sql = DB::DIALECT.schema(statement);

        self.execute_script(&sql).await
    }

    pub fn find<T: Snapshot>(&mut self) -> Find<'_, DB, T> {
        Find::new(self)
    }

    pub async fn get<T: Snapshot>(&mut self, id: IdOf<T>) -> Result<Loaded<T>> {
        self.check::<T>()?;

        let key: Key = id.into();
        if let Some(entry) = self.entry(T::TABLE, key) {
            if entry.status == Status::Deleted {
                return Err(SnapshotError::Deleted {
                    table: T::TABLE,
                    key,
                });
            }

            return Ok(Loaded::new(id, T::decode(&entry.record())?));
        }

        match self.find::<T>().eq("id", key).first().await? {
            Some(row) => Ok(row),
            None => Err(SnapshotError::NotFound {
                table: T::TABLE,
                key: Some(key),
            }),
        }
    }

    /// Tracks a new row. Its id and audit rows are allocated right away, the
    /// rows are written on the next flush.
    pub async fn create<T: Snapshot>(&mut self, value: T) -> Result<Loaded<T>> {
        self.check::<T>()?;

        let shape = <T::Generation as Generation>::SHAPE;
        let key = self.allocate(shape.key, T::TABLE).await?;
        let audit = match shape.audit {
            AuditLayout::CreatedModified => AuditRef::CreatedModified {
                created: self.allocate(shape.key, TRANSACTION_ENTRY).await?,
                modified: self.allocate(shape.key, TRANSACTION_ENTRY).await?,
            },
            AuditLayout::Single { .. } => {
                AuditRef::Single(self.allocate(shape.key, TRANSACTION_ENTRY).await?)
            }
        };

        let id = <IdOf<T> as FromValue>::from_value(&Value::from(key)).map_err(|mismatch| SqlError::Decode {
            column: "id".to_owned(),
            expected: mismatch.expected,
            found: mismatch.found,
        })?;

        let values = value.encode();
        let issued = self.issue();

        self.entries.push(Entry {
            table: T::TABLE,
            key,
            shape,
            audit: Some(audit),
            persisted: Vec::new(),
            current: values.clone(),
            baseline: values,
            status: Status::Created,
            issued,
            hooked: None,
            run_hook: run_hook::<T>,
        });

        Ok(Loaded::new(id, value))
    }

    /// Records the values the caller changed on a tracked row. A row whose
    /// values did not change stays clean.
    ///
    /// Only columns that differ from what the caller last saw are taken, so
    /// saving a row untouched keeps the values hooks wrote on flush. Use
    /// [`get`](Session::get) to read those values back.
    pub fn save<T: Snapshot>(&mut self, row: &Loaded<T>) -> Result<Status> {
        self.check::<T>()?;

        let key = row.key();
        let issued = self.issue();
        let entry = self.entry_mut(T::TABLE, key)?;

        if entry.status == Status::Deleted {
            return Err(SnapshotError::Deleted {
                table: T::TABLE,
                key,
            });
        }

        entry.merge(row.encode());

        if entry.status == Status::Created {
            return Ok(Status::Created);
        }

        let status = if entry.changed().is_empty() {
            entry.hooked = None;
            Status::Clean
        } else {
            Status::Updated
        };

        if entry.status == Status::Clean && status == Status::Updated {
            entry.issued = issued;
        }

        entry.status = status;

        Ok(status)
    }

    /// Marks a row for deletion. A row created in this session is simply
    /// forgotten.
    pub fn delete<T: Snapshot>(&mut self, row: Loaded<T>) -> Result<()> {
        self.check::<T>()?;

        let key = row.key();
        let issued = self.issue();
        let index = self.position(T::TABLE, key).ok_or(SnapshotError::Untracked {
            table: T::TABLE,
            key,
        })?;

        match self.entries[index].status {
            Status::Deleted => Err(SnapshotError::Deleted {
                table: T::TABLE,
                key,
            }),
            Status::Created => {
                self.entries.remove(index);
                Ok(())
            }
            Status::Updated | Status::Clean => {
                let entry = &mut self.entries[index];
                entry.status = Status::Deleted;
                entry.issued = issued;
                Ok(())
            }
        }
    }

    pub fn status<T: Snapshot>(&self, row: &Loaded<T>) -> Option<Status> {
        self.entry(T::TABLE, row.key()).map(|entry| entry.status)
    }

    /// Audit rows of a tracked row, the created entry first in generation 1.
    pub async fn entries<T: Snapshot>(
        &mut self,
        row: &Loaded<T>,
    ) -> Result<Vec<<T::Generation as Generation>::Entry>> {
        self.flush().await?;

        let key = row.key();
        let ids = self
            .entry(T::TABLE, key)
            .ok_or(SnapshotError::Untracked {
                table: T::TABLE,
                key,
            })?
            .audit
            .map(|audit| audit.ids())
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(ids.len());

        for id in ids {
            let statement = Query::select()
                .columns(
                    <<T::Generation as Generation>::Entry as AuditEntry>::COLUMNS
                        .iter()
                        .map(|column| Alias::new(*column)),
                )
                .from(TransactionEntry::Table)
                .and_where(Expr::col(TransactionEntry::Id).eq(key_value(id)))
                .to_owned();

            if let Some(record) = DB::query(&mut *self.tx, &statement).await?.first() {
                entries.push(<<T::Generation as Generation>::Entry as AuditEntry>::decode(record)?);
            }
        }

        Ok(entries)
    }

    /// Reads a column the snapshot does not declare, as unparsed bytes.
    pub async fn read_undeclared<T: Snapshot>(
        &mut self,
        row: &Loaded<T>,
        column: &str,
    ) -> Result<Option<Vec<u8>>> {
        let key = row.key();
        let statement = Query::select()
            .column(Alias::new(column))
            .from(Alias::new(T::TABLE))
            .and_where(Expr::col(Alias::new("id")).eq(key_value(key)))
            .to_owned();

        let record = self
            .fetch_optional(&statement)
            .await?
            .ok_or(SnapshotError::NotFound {
                table: T::TABLE,
                key: Some(key),
            })?;

        let value = record.get::<Value>(column)?;

        Ok(raw_bytes(value))
    }

    /// Fills `table.column` with `default` in batches and makes it not null.
    pub async fn default_column(
        &mut self,
        table: &str,
        column: &str,
        default: impl Into<Value>,
    ) -> Result<DefaultReport> {
        let job =
            BatchDefault::new(table, column, default.into()).batch_size(self.options.batch_size);

        self.run_default(&job).await
    }

    pub async fn run_default(&mut self, job: &BatchDefault) -> Result<DefaultReport> {
        self.flush().await?;

        Ok(job.run::<DB>(&mut *self.tx).await?)
    }

    /// The contract violation raised by this session, if any.
    pub fn take_violation(&mut self) -> Option<Violation> {
        self.violation.take()
    }

    /// Writes pending changes without committing.
    ///
    /// Statements run in the order the changes were issued, inside a
    /// savepoint. A failed flush leaves the pending changes in place and
    /// can be retried; hooks that already ran do not run again.
    pub async fn flush(&mut self) -> Result<()> {
        if self
            .entries
            .iter()
            .all(|entry| entry.status == Status::Clean)
        {
            return Ok(());
        }

        let context = self.options.context;
        let now = Utc::now();

        for (event, status) in [
            (Lifecycle::OnDelete, Status::Deleted),
            (Lifecycle::OnCreate, Status::Created),
            (Lifecycle::OnUpdate, Status::Updated),
        ] {
            for entry in self.entries.iter_mut().filter(|e| e.status == status) {
                if entry.hooked == Some(event) {
                    continue;
                }

                let hook_context = HookContext {
                    generation: entry.shape.number,
                    table: entry.table,
                    key: entry.key,
                    actor: context.actor,
                    station: context.station,
                    now,
                };

                let values = (entry.run_hook)(event, &entry.current, &hook_context)?;
                entry.hooked = Some(event);

                if status != Status::Deleted {
                    if let Some(values) = values {
                        entry.current = values;
                    }
                }
            }
        }

        let mut changes = self
            .entries
            .iter()
            .filter_map(|entry| Some((entry.issued, entry.change(&context, now)?)))
            .collect::<Vec<_>>();
        changes.sort_by_key(|(issued, _)| *issued);

        let steps = plan::build(changes.into_iter().map(|(_, change)| change).collect());

        tracing::debug!(steps = steps.len(), "flushing session");

        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        for step in steps {
            if let Err(err) = execute_step::<DB>(&mut *savepoint, step).await {
                if let Err(rollback) = savepoint.rollback().await {
                    tracing::warn!(error = %rollback, "failed to roll back flush savepoint");
                }

                return Err(err);
            }
        }

        savepoint.commit().await?;

        self.entries.retain(|entry| entry.status != Status::Deleted);
        for entry in self.entries.iter_mut() {
            entry.persisted = entry.current.clone();
            entry.status = Status::Clean;
            entry.hooked = None;
        }

        Ok(())
    }

    pub async fn commit(mut self) -> Result<()> {
        self.flush().await?;
        self.tx.commit().await?;

        Ok(())
    }

    /// Discards the transaction along with every pending change.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;

        Ok(())
    }

    pub(crate) fn check<T: Snapshot>(&mut self) -> Result<()> {
        let snapshot_generation = <T::Generation as Generation>::SHAPE.number;
        let session_generation = self.options.generation;

        if snapshot_generation <= session_generation {
            return Ok(());
        }

        let snapshot = std::any::type_name::<T>().to_owned();
        self.violation = Some(Violation {
            snapshot: snapshot.clone(),
            snapshot_generation,
            session_generation,
        });

        Err(SnapshotError::ContractViolation {
            snapshot,
            snapshot_generation,
            session_generation,
        })
    }

    /// Tracks a loaded row, or returns the tracked version of it.
    pub(crate) fn track<T: Snapshot>(&mut self, record: &Record) -> Result<Loaded<T>> {
        let shape = <T::Generation as Generation>::SHAPE;
        let id = record.get::<IdOf<T>>("id")?;
        let key: Key = id.into();

        if let Some(entry) = self.entry(T::TABLE, key) {
            return Ok(Loaded::new(id, T::decode(&entry.record())?));
        }

        let value = T::decode(record)?;
        let values = value.encode();

        self.entries.push(Entry {
            table: T::TABLE,
            key,
            shape,
            audit: AuditRef::read(shape, record)?,
            persisted: values.clone(),
            current: values.clone(),
            baseline: values,
            status: Status::Clean,
            issued: 0,
            hooked: None,
            run_hook: run_hook::<T>,
        });

        Ok(Loaded::new(id, value))
    }

    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn position(&self, table: &str, key: Key) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.table == table && entry.key == key)
    }

    fn entry(&self, table: &str, key: Key) -> Option<&Entry> {
        self.position(table, key).map(|index| &self.entries[index])
    }

    fn entry_mut(&mut self, table: &'static str, key: Key) -> Result<&mut Entry> {
        let index = self
            .position(table, key)
            .ok_or(SnapshotError::Untracked { table, key })?;

        Ok(&mut self.entries[index])
    }

    /// Allocates a primary key in `table`.
    ///
    /// Integer keys come from the table sequence when the backend has one,
    /// otherwise from the highest id in the table and the ids already handed
    /// out by this session.
    async fn allocate(&mut self, kind: KeyKind, table: &'static str) -> Result<Key> {
        if kind == KeyKind::Uuid {
            return Ok(Key::Uuid(Uuid::new_v4()));
        }

        if let Some(id) = DB::next_id(&mut *self.tx, table, "id").await? {
            return Ok(Key::Int(id));
        }

        let statement = Query::select()
            .expr(Func::max(Expr::col(Alias::new("id"))))
            .from(Alias::new(table))
            .to_owned();

        let max = match DB::query(&mut *self.tx, &statement).await?.first() {
            Some(record) => record.first::<Option<i64>>()?.unwrap_or(0),
            None => 0,
        };

        let high_water = self.high_water.entry(table).or_insert(0);
        *high_water = max.max(*high_water) + 1;

        Ok(Key::Int(*high_water))
    }
}

async fn execute_step<DB: Backend>(conn: &mut DB::Connection, step: Step) -> Result<()> {
    match step {
        Step::InsertAudit(values) => {
            let statement = insert(TransactionEntry::Table, values)?;
            DB::run(&mut *conn, &statement).await?;
        }
        Step::InsertRow { table, values } => {
            let statement = insert(Alias::new(table), values)?;
            DB::run(&mut *conn, &statement).await?;
        }
        Step::UpdateRow { table, key, values } => {
            let statement = Query::update()
                .table(Alias::new(table))
                .values(
                    values
                        .into_iter()
                        .map(|(column, value)| (Alias::new(column), SimpleExpr::Value(value.into()))),
                )
                .and_where(Expr::col(Alias::new("id")).eq(key_value(key)))
                .to_owned();
            DB::run(&mut *conn, &statement).await?;
        }
        Step::RefreshAudit { id, values } => {
            let statement = Query::update()
                .table(TransactionEntry::Table)
                .values(
                    values
                        .into_iter()
                        .map(|(column, value)| (Alias::new(column), SimpleExpr::Value(value.into()))),
                )
                .and_where(Expr::col(TransactionEntry::Id).eq(key_value(id)))
                .to_owned();

            if DB::run(&mut *conn, &statement).await? == 0 {
                tracing::warn!(%id, "audit entry to refresh not found");
            }
        }
        Step::DeleteRow { table, key } => {
            let statement = Query::delete()
                .from_table(Alias::new(table))
                .and_where(Expr::col(Alias::new("id")).eq(key_value(key)))
                .to_owned();

            if DB::run(&mut *conn, &statement).await? == 0 {
                tracing::warn!(table, %key, "row to delete not found");
            }
        }
        Step::DeleteAudit(id) => {
            let statement = Query::delete()
                .from_table(TransactionEntry::Table)
                .and_where(Expr::col(TransactionEntry::Id).eq(key_value(id)))
                .to_owned();
            DB::run(&mut *conn, &statement).await?;
        }
    }

    Ok(())
}
