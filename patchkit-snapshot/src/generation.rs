use std::fmt::Debug;

use chrono::{DateTime, Utc};
use patchkit_sql::{FromValue, Key, Kind, Record, Value};

/// Name of the audit table shared by every generation.
pub const TRANSACTION_ENTRY: &str = "transaction_entry";

/// Primary key type of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Int,
    Uuid,
}

/// How business rows of a generation reference their audit rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLayout {
    /// Two entries per row, `te_created_id` and `te_modified_id`.
    CreatedModified,
    /// One entry per row in `te_id`, carrying a dirty flag and, when `actor`
    /// is set, the user and station that touched the row.
    Single { actor: bool },
}

/// Frozen shape of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub number: u8,
    pub key: KeyKind,
    pub audit: AuditLayout,
}

impl Shape {
    /// Columns of a business row pointing at its audit rows.
    pub fn audit_references(&self) -> &'static [&'static str] {
        match self.audit {
            AuditLayout::CreatedModified => &["te_created_id", "te_modified_id"],
            AuditLayout::Single { .. } => &["te_id"],
        }
    }

    fn records_actor(&self) -> bool {
        match self.audit {
            AuditLayout::CreatedModified => true,
            AuditLayout::Single { actor } => actor,
        }
    }

    /// Actor and station ids are only written when their key type matches
    /// the generation, a mismatching id is stored as null.
    fn actor_value(&self, key: Option<Key>) -> Value {
        match (self.key, key) {
            (KeyKind::Int, Some(Key::Int(id))) => Value::Int(id),
            (KeyKind::Uuid, Some(Key::Uuid(id))) => Value::Uuid(id),
            (KeyKind::Int, _) => Value::Null(Kind::Int),
            (KeyKind::Uuid, _) => Value::Null(Kind::Uuid),
        }
    }

    /// Columns of a fresh audit row.
    pub(crate) fn new_entry(
        &self,
        id: Key,
        context: &Context,
        now: DateTime<Utc>,
    ) -> Vec<(&'static str, Value)> {
        let mut values = vec![("id", Value::from(id))];
        values.extend(self.refresh_entry(context, now));
        values
    }

    /// Columns rewritten on the audit row of an updated business row.
    pub(crate) fn refresh_entry(
        &self,
        context: &Context,
        now: DateTime<Utc>,
    ) -> Vec<(&'static str, Value)> {
        let mut values = vec![("te_time", Value::Timestamp(now))];

        if self.records_actor() {
            values.push(("user_id", self.actor_value(context.actor)));
            values.push(("station_id", self.actor_value(context.station)));
        }

        if let AuditLayout::Single { .. } = self.audit {
            values.push(("dirty", Value::Bool(true)));
        }

        values
    }
}

/// A frozen audit row as seen by one generation.
pub trait AuditEntry: Sized + Send + Debug {
    const COLUMNS: &'static [&'static str];

    fn decode(record: &Record) -> patchkit_sql::Result<Self>;
}

/// A schema generation: primary key type, audit layout and audit row shape.
pub trait Generation: Send + Sync + 'static {
    const SHAPE: Shape;

    type Id: Copy + Debug + PartialEq + Into<Key> + FromValue + Send + Sync + 'static;

    type Entry: AuditEntry;
}

/// Who is applying the changes, written on audit rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub actor: Option<Key>,
    pub station: Option<Key>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: impl Into<Key>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn station(mut self, station: impl Into<Key>) -> Self {
        self.station = Some(station.into());
        self
    }
}

/// What a lifecycle hook knows about the change it is called for.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    pub generation: u8,
    pub table: &'static str,
    pub key: Key,
    pub actor: Option<Key>,
    pub station: Option<Key>,
    pub now: DateTime<Utc>,
}
