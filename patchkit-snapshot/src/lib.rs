#![forbid(unsafe_code)]

mod error;
mod find;
mod generation;
mod plan;
mod session;
mod snapshot;

pub mod v1;
pub mod v2;
pub mod v3;
pub mod v4;

pub use error::{Lifecycle, Result, SnapshotError};
pub use find::Find;
pub use generation::{
    AuditEntry, AuditLayout, Context, Generation, HookContext, KeyKind, Shape, TRANSACTION_ENTRY,
};
pub use session::{Session, SessionOptions, Status, Violation, LATEST_GENERATION};
pub use snapshot::{Hook, Hooks, IdOf, Loaded, Snapshot};

pub use patchkit_sql::{Key, Record, Result as SqlResult, Value};
