#![forbid(unsafe_code)]

mod backend;
mod defaulter;
mod dialect;
mod error;
mod value;

pub use backend::{Backend, ColumnInfo};
pub use defaulter::{BatchDefault, DefaultReport, DEFAULT_BATCH_SIZE};
pub use dialect::{quote_ident, Dialect};
pub use error::{Result, SqlError};
pub use value::{FromValue, Key, Kind, Mismatch, Record, Value};

pub use sea_query;
pub use sea_query_binder;
