//! Runner configuration and its defaults.

use std::time::Duration;

use patchkit_snapshot::Context;

pub use patchkit_sql::DEFAULT_BATCH_SIZE;

/// Extension of programmatic patch files in a patch directory.
pub const DEFAULT_CODE_EXTENSION: &str = "rs";

/// `field_name` of the row holding the schema version.
pub const SCHEMA_VERSION_FIELD: &str = "SCHEMA_VERSION";

#[derive(Debug, Clone)]
pub struct Config {
    /// Batch size of `Session::default_column` inside patches.
    pub batch_size: usize,

    /// `field_name` of the schema version row.
    pub version_field: String,

    /// Bounds every statement of a patch transaction. Postgres only.
    pub statement_timeout: Option<Duration>,

    /// Advisory lock held for the whole of `apply_all`. Postgres only.
    pub advisory_lock: Option<i64>,

    /// Actor and station written on audit rows.
    pub context: Context,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            version_field: SCHEMA_VERSION_FIELD.to_owned(),
            statement_timeout: None,
            advisory_lock: None,
            context: Context::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn version_field(mut self, field: impl Into<String>) -> Self {
        self.config.version_field = field.into();
        self
    }

    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.config.statement_timeout = Some(timeout);
        self
    }

    pub fn advisory_lock(mut self, key: i64) -> Self {
        self.config.advisory_lock = Some(key);
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.config.context = context;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
