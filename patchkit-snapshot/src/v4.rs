//! Generation 4: UUID keys, the audit row keeps only a timestamp and a dirty
//! flag.

use chrono::{DateTime, Utc};
use patchkit_sql::Record;
use uuid::Uuid;

use crate::generation::{AuditEntry, AuditLayout, Generation, KeyKind, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V4;

impl Generation for V4 {
    const SHAPE: Shape = Shape {
        number: 4,
        key: KeyKind::Uuid,
        audit: AuditLayout::Single { actor: false },
    };

    type Id = Uuid;
    type Entry = TransactionEntry;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub id: Uuid,
    pub te_time: DateTime<Utc>,
    pub dirty: bool,
}

impl AuditEntry for TransactionEntry {
    const COLUMNS: &'static [&'static str] = &["id", "te_time", "dirty"];

    fn decode(record: &Record) -> patchkit_sql::Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            te_time: record.get("te_time")?,
            dirty: record.get("dirty")?,
        })
    }
}
