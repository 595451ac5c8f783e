//! Service configuration shared by the binary and tests

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

/// Default upload limit for the multipart body, in MiB
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// How long a connection waits for a competing writer before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How rows get their primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IdStrategy {
    /// The database assigns sequential integer ids; the CSV id column is ignored.
    /// Re-importing an archive adds every row again.
    #[default]
    Generated,
    /// The CSV id column is the primary key and duplicates are silently ignored.
    /// Re-importing an archive is idempotent.
    Natural,
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdStrategy::Generated => write!(f, "generated"),
            IdStrategy::Natural => write!(f, "natural"),
        }
    }
}

/// Everything needed to open the store and serve the API
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database: PathBuf,
    pub id_strategy: IdStrategy,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn new(database: impl Into<PathBuf>, id_strategy: IdStrategy) -> Self {
        Self {
            database: database.into(),
            id_strategy,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB << 20,
        }
    }

    pub fn with_max_upload_mb(mut self, megabytes: usize) -> Self {
        self.max_upload_bytes = megabytes << 20;
        self
    }
}
