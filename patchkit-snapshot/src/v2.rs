//! Generation 2: integer keys, a single audit entry per row with a dirty flag.

use chrono::{DateTime, Utc};
use patchkit_sql::Record;

use crate::generation::{AuditEntry, AuditLayout, Generation, KeyKind, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2;

impl Generation for V2 {
    const SHAPE: Shape = Shape {
        number: 2,
        key: KeyKind::Int,
        audit: AuditLayout::Single { actor: true },
    };

    type Id = i64;
    type Entry = TransactionEntry;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub id: i64,
    pub te_time: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub station_id: Option<i64>,
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
