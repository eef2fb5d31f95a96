use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use patchkit_snapshot::Session;
use patchkit_sql::Backend;

/// Prefix shared by every patch name.
pub const PATCH_PREFIX: &str = "patch-";

/// Position of a patch in the upgrade history, `(generation, version)`.
///
/// Keys order lexicographically and render as `GG.VV`, the format of the
/// schema version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatchKey {
    pub generation: u16,
    pub version: u16,
}

impl PatchKey {
    pub const fn new(generation: u16, version: u16) -> Self {
        Self {
            generation,
            version,
        }
    }

    /// Parses a `patch-GG-VV` name, each part being at least two digits.
    pub fn from_name(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(PATCH_PREFIX)?;
        let (generation, version) = rest.split_once('-')?;

        Some(Self::new(number(generation, 2)?, number(version, 2)?))
    }

    /// The canonical `patch-GG-VV` name.
    pub fn name(&self) -> String {
        format!(
            "{PATCH_PREFIX}{:02}-{:02}",
            self.generation, self.version
        )
    }
}

fn number(part: &str, min_digits: usize) -> Option<u16> {
    if part.len() < min_digits || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    part.parse().ok()
}

impl fmt::Display for PatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.generation, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid patch key `{0}`")]
pub struct ParseKeyError(String);

impl FromStr for PatchKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseKeyError(s.to_owned());
        let (generation, version) = s.trim().split_once('.').ok_or_else(err)?;

        Ok(Self::new(
            number(generation, 1).ok_or_else(err)?,
            number(version, 1).ok_or_else(err)?,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Sql,
    Code,
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchKind::Sql => f.write_str("sql"),
            PatchKind::Code => f.write_str("code"),
        }
    }
}

/// Where the body of a patch comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    File(PathBuf),
    Inline(Arc<str>),
    Code { name: String },
}

/// A discovered patch. Created by the loader and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub key: PatchKey,
    pub kind: PatchKind,
    pub source: PatchSource,
    /// Snapshot generation imported by a programmatic patch.
    pub snapshot_generation: Option<u8>,
}

impl PatchDescriptor {
    pub fn generation(&self) -> u16 {
        self.key.generation
    }

    pub fn version(&self) -> u16 {
        self.key.version
    }

    pub fn name(&self) -> String {
        self.key.name()
    }

    /// Human readable origin, used in errors.
    pub fn origin(&self) -> String {
        match &self.source {
            PatchSource::File(path) => path.display().to_string(),
            PatchSource::Inline(_) => format!("{} (inline)", self.name()),
            PatchSource::Code { name } => format!("{name} (code)"),
        }
    }
}

impl fmt::Display for PatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key.name(), self.kind)
    }
}

/// A programmatic patch.
///
/// The patch runs inside the transaction the runner opened for it; returning
/// an error rolls everything back.
///
/// ```no_run
/// use patchkit::{Patch, Session};
///
/// struct AddAccountType;
///
/// #[async_trait::async_trait]
/// impl Patch<sqlx::Sqlite> for AddAccountType {
///     fn name(&self) -> &str {
///         "patch-02-30"
///     }
///
///     fn generation(&self) -> u8 {
///         1
///     }
///
///     async fn apply_patch(&self, session: &mut Session<sqlx::Sqlite>) -> anyhow::Result<()> {
///         session
///             .execute_script("ALTER TABLE account ADD COLUMN account_type integer")
///             .await?;
///
///         Ok(())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Patch<DB: Backend>: Send + Sync {
    /// `patch-GG-VV`.
    fn name(&self) -> &str;

    /// Snapshot generation the patch reads and writes rows with.
    fn generation(&self) -> u8;

    async fn apply_patch(&self, session: &mut Session<DB>) -> anyhow::Result<()>;
}

/// A loaded patch, ready to run.
pub enum PatchBody<'a, DB: Backend> {
    Sql(String),
    Code(&'a dyn Patch<DB>),
}

impl<DB: Backend> fmt::Debug for PatchBody<'_, DB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchBody::Sql(script) => f.debug_tuple("Sql").field(script).finish(),
            PatchBody::Code(patch) => f.debug_tuple("Code").field(&patch.name()).finish(),
        }
    }
}
