use std::fmt;

use patchkit_sql::{Key, SqlError};

/// Lifecycle event a hook is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    OnCreate,
    OnUpdate,
    OnDelete,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::OnCreate => f.write_str("on_create"),
            Lifecycle::OnUpdate => f.write_str("on_update"),
            Lifecycle::OnDelete => f.write_str("on_delete"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// A snapshot newer than the generation the session was opened for.
    #[error("snapshot `{snapshot}` belongs to generation {snapshot_generation}, session is limited to generation {session_generation}")]
    ContractViolation {
        snapshot: String,
        snapshot_generation: u8,
        session_generation: u8,
    },

    #[error("no `{table}` row found")]
    NotFound {
        table: &'static str,
        key: Option<Key>,
    },

    #[error("more than one `{table}` row found")]
    MultipleRows { table: &'static str },

    /// The row was not loaded or created through this session.
    #[error("`{table}` row {key} is not tracked by this session")]
    Untracked { table: &'static str, key: Key },

    #[error("`{table}` row {key} was deleted in this session")]
    Deleted { table: &'static str, key: Key },

    #[error("{hook} hook of `{table}` failed: {source}")]
    Hook {
        table: &'static str,
        hook: Lifecycle,
        #[source]
        source: anyhow::Error,
    },
}

impl From<sqlx::Error> for SnapshotError {
    fn from(value: sqlx::Error) -> Self {
        SnapshotError::Sql(value.into())
    }
}

impl From<sea_query::error::Error> for SnapshotError {
    fn from(value: sea_query::error::Error) -> Self {
        SnapshotError::Sql(value.into())
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
