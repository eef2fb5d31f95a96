//! Generation 1: integer keys, each business row owns a created and a
//! modified audit entry.

use chrono::{DateTime, Utc};
use patchkit_sql::Record;

use crate::generation::{AuditEntry, AuditLayout, Generation, KeyKind, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V1;

impl Generation for V1 {
    const SHAPE: Shape = Shape {
        number: 1,
        key: KeyKind::Int,
        audit: AuditLayout::CreatedModified,
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
}

impl AuditEntry for TransactionEntry {
    const COLUMNS: &'static [&'static str] = &["id", "te_time", "user_id", "station_id"];

    fn decode(record: &Record) -> patchkit_sql::Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            te_time: record.get("te_time")?,
            user_id: record.get("user_id")?,
            station_id: record.get("station_id")?,
        })
    }
}
