//! Generation 3: UUID keys, a single audit entry per row recording the actor.

use chrono::{DateTime, Utc};
use patchkit_sql::Record;
use uuid::Uuid;

use crate::generation::{AuditEntry, AuditLayout, Generation, KeyKind, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V3;

impl Generation for V3 {
    const SHAPE: Shape = Shape {
        number: 3,
        key: KeyKind::Uuid,
        audit: AuditLayout::Single { actor: true },
    };

    type Id = Uuid;
    type Entry = TransactionEntry;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub id: Uuid,
    pub te_time: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub station_id: Option<Uuid>,
    pub dirty: bool,
}

impl AuditEntry for TransactionEntry {
    const COLUMNS: &'static [&'static str] = &["id", "te_time", "user_id", "station_id", "dirty"];

    fn decode(record: &Record) -> patchkit_sql::Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            te_time: record.get("te_time")?,
            user_id: record.get("user_id")?,
            station_id: record.get("station_id")?,
            dirty: record.get("dirty")?,
        })
    }
}
