use patchkit_sql::SqlError;

use crate::patch::{PatchDescriptor, PatchKey};

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("malformed patch name `{name}`")]
    MalformedPatch { name: String },

    #[error("`{first}` and `{second}` are both patch {key}")]
    AmbiguousPatch {
        key: PatchKey,
        first: String,
        second: String,
    },

    #[error("invalid patch `{name}`: {reason}")]
    InvalidPatch { name: String, reason: String },

    #[error("patch {descriptor} failed (rolled back: {rolled_back}): {cause:#}")]
    PatchExecutionFailed {
        descriptor: PatchDescriptor,
        #[source]
        cause: anyhow::Error,
        rolled_back: bool,
    },

    #[error("database is at {recorded} but the newest patch is {latest}")]
    VersionRegressed { recorded: PatchKey, latest: PatchKey },

    #[error("patch {descriptor} of generation {patch_generation} used `{snapshot}` of generation {snapshot_generation}")]
    SnapshotContractViolation {
        descriptor: PatchDescriptor,
        snapshot: String,
        snapshot_generation: u8,
        patch_generation: u8,
    },

    #[error("schema version row not found")]
    Uninitialized,

    #[error("malformed schema version `{0}`")]
    MalformedVersion(String),

    #[error("patch {key} does not follow the recorded version {current}")]
    OutOfOrder { key: PatchKey, current: PatchKey },

    #[error("advisory lock {0} is held by another runner")]
    Locked(i64),

    #[error("io `{0}`")]
    Io(#[from] std::io::Error),

    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),

    #[error("{0}")]
    Sql(#[from] SqlError),
}

impl MigrateError {
    /// The patch that failed, for errors raised while running one.
    pub fn descriptor(&self) -> Option<&PatchDescriptor> {
        match self {
            MigrateError::PatchExecutionFailed { descriptor, .. }
            | MigrateError::SnapshotContractViolation { descriptor, .. } => Some(descriptor),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
