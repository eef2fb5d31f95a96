//! Ordered, transactional schema patches.
//!
//! A database records the newest patch applied to it in a single
//! `parameter_data` row. The [`Runner`] compares it with the patches a
//! [`Loader`] discovers and applies the newer ones in `(generation, version)`
//! order, each inside its own transaction together with the version update.
//!
//! Patches are either SQL scripts or [`Patch`] implementations. The latter
//! receive a [`Session`] and read and write rows through frozen snapshots of
//! one generation, see [`snapshot`].
//!
//! # Features
//!
//! - **`pg`** - PostgreSQL support
//! - **`sqlite`** - SQLite support
//!
//! Both are enabled by default.

#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod patch;
mod runner;

pub use config::{
    Config, ConfigBuilder, DEFAULT_BATCH_SIZE, DEFAULT_CODE_EXTENSION, SCHEMA_VERSION_FIELD,
};
pub use error::{MigrateError, Result};
pub use loader::Loader;
pub use patch::{
    ParseKeyError, Patch, PatchBody, PatchDescriptor, PatchKey, PatchKind, PatchSource,
};
pub use runner::{Runner, Status};

pub use patchkit_snapshot::{Context, Session};
pub use patchkit_sql::{Backend, BatchDefault, DefaultReport};

pub use patchkit_snapshot as snapshot;
pub use patchkit_sql as sql;
