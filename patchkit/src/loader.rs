use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use patchkit_snapshot::LATEST_GENERATION;
use patchkit_sql::Backend;

use crate::config::DEFAULT_CODE_EXTENSION;
use crate::error::{MigrateError, Result};
use crate::patch::{Patch, PatchBody, PatchDescriptor, PatchKey, PatchKind, PatchSource, PATCH_PREFIX};

/// Discovers patches and hands their bodies to the runner.
///
/// Patches come from a directory of `patch-GG-VV.sql` files, from scripts
/// registered inline and from registered [`Patch`] implementations. A
/// `patch-GG-VV.<code-ext>` file in the directory declares a programmatic
/// patch that must also be registered.
pub struct Loader<DB: Backend> {
    directory: Option<PathBuf>,
    code_extension: String,
    inline: Vec<(String, Arc<str>)>,
    code: Vec<Box<dyn Patch<DB>>>,
}

impl<DB: Backend> Default for Loader<DB> {
    fn default() -> Self {
        Self::new()
    }
}

impl<DB: Backend> fmt::Debug for Loader<DB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("directory", &self.directory)
            .field("code_extension", &self.code_extension)
            .field(
                "inline",
                &self.inline.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field(
                "code",
                &self.code.iter().map(|patch| patch.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<DB: Backend> Loader<DB> {
    pub fn new() -> Self {
        Self {
            directory: None,
            code_extension: DEFAULT_CODE_EXTENSION.to_owned(),
            inline: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    pub fn code_extension(mut self, extension: impl Into<String>) -> Self {
        self.code_extension = extension.into();
        self
    }

    /// Registers an SQL patch, `name` being `patch-GG-VV` with an optional
    /// `.sql` suffix.
    pub fn sql(mut self, name: impl Into<String>, script: impl Into<Arc<str>>) -> Self {
        self.inline.push((name.into(), script.into()));
        self
    }

    pub fn code<P: Patch<DB> + 'static>(mut self, patch: P) -> Self {
        self.code.push(Box::new(patch));
        self
    }

    /// Every patch, ascending by key.
    pub async fn enumerate(&self) -> Result<Vec<PatchDescriptor>> {
        let mut found = BTreeMap::new();
        let mut code_files = Vec::new();

        if let Some(directory) = &self.directory {
            for (key, kind, path) in self.scan(directory).await? {
                match kind {
                    PatchKind::Sql => insert(
                        &mut found,
                        PatchDescriptor {
                            key,
                            kind,
                            source: PatchSource::File(path),
                            snapshot_generation: None,
                        },
                    )?,
                    PatchKind::Code => code_files.push((key, path)),
                }
            }
        }

        for (name, script) in &self.inline {
            let stem = name.strip_suffix(".sql").unwrap_or(name);
            let key = PatchKey::from_name(stem).ok_or_else(|| MigrateError::MalformedPatch {
                name: name.to_owned(),
            })?;

            insert(
                &mut found,
                PatchDescriptor {
                    key,
                    kind: PatchKind::Sql,
                    source: PatchSource::Inline(script.clone()),
                    snapshot_generation: None,
                },
            )?;
        }

        for patch in &self.code {
            let name = patch.name();
            let key = PatchKey::from_name(name).ok_or_else(|| MigrateError::MalformedPatch {
                name: name.to_owned(),
            })?;

            let generation = patch.generation();
            if !(1..=LATEST_GENERATION).contains(&generation) {
                return Err(MigrateError::InvalidPatch {
                    name: name.to_owned(),
                    reason: format!("unknown snapshot generation {generation}"),
                });
            }

            insert(
                &mut found,
                PatchDescriptor {
                    key,
                    kind: PatchKind::Code,
                    source: PatchSource::Code {
                        name: name.to_owned(),
                    },
                    snapshot_generation: Some(generation),
                },
            )?;
        }

        for (key, path) in code_files {
            match found.get(&key) {
                Some(descriptor) if descriptor.kind == PatchKind::Code => {}
                Some(descriptor) => {
                    return Err(MigrateError::AmbiguousPatch {
                        key,
                        first: descriptor.origin(),
                        second: path.display().to_string(),
                    })
                }
                None => {
                    return Err(MigrateError::InvalidPatch {
                        name: path.display().to_string(),
                        reason: "no `apply_patch` entry point registered".to_owned(),
                    })
                }
            }
        }

        let descriptors = found.into_values().collect::<Vec<_>>();

        let mut newest = 0;
        for descriptor in &descriptors {
            let Some(generation) = descriptor.snapshot_generation else {
                continue;
            };

            if generation < newest {
                return Err(MigrateError::InvalidPatch {
                    name: descriptor.name(),
                    reason: format!(
                        "imports snapshot generation {generation} after generation {newest} shipped"
                    ),
                });
            }

            newest = generation;
        }

        Ok(descriptors)
    }

    /// The body of a patch. SQL files are read now, not at discovery.
    pub async fn load(&self, descriptor: &PatchDescriptor) -> Result<PatchBody<'_, DB>> {
        match &descriptor.source {
            PatchSource::File(path) => {
                let script = tokio::fs::read_to_string(path).await?;

                Ok(PatchBody::Sql(script))
            }
            PatchSource::Inline(script) => Ok(PatchBody::Sql(script.to_string())),
            PatchSource::Code { name } => self
                .code
                .iter()
                .find(|patch| patch.name() == name.as_str())
                .map(|patch| PatchBody::Code(patch.as_ref()))
                .ok_or_else(|| MigrateError::InvalidPatch {
                    name: name.to_owned(),
                    reason: "not registered with this loader".to_owned(),
                }),
        }
    }

    async fn scan(&self, directory: &Path) -> Result<Vec<(PatchKey, PatchKind, PathBuf)>> {
        let mut patches = Vec::new();
        let mut entries = tokio::fs::read_dir(directory).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !entry.file_type().await?.is_file() {
                continue;
            }

            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            if !file_name.starts_with(PATCH_PREFIX) {
                continue;
            }

            let kind = match path.extension().and_then(|ext| ext.to_str()) {
                Some("sql") => PatchKind::Sql,
                Some(ext) if ext == self.code_extension => PatchKind::Code,
                _ => continue,
            };

            let key = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(PatchKey::from_name)
                .ok_or_else(|| MigrateError::MalformedPatch {
                    name: file_name.to_owned(),
                })?;

            patches.push((key, kind, path));
        }

        Ok(patches)
    }
}

fn insert(found: &mut BTreeMap<PatchKey, PatchDescriptor>, descriptor: PatchDescriptor) -> Result<()> {
    if let Some(existing) = found.get(&descriptor.key) {
        return Err(MigrateError::AmbiguousPatch {
            key: descriptor.key,
            first: existing.origin(),
            second: descriptor.origin(),
        });
    }

    found.insert(descriptor.key, descriptor);

    Ok(())
}
