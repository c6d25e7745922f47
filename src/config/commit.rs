use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Batch committer timing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommitConfig {
    /// Interval between drain-and-commit cycles (milliseconds)
    #[serde(default = "default_commit_interval_ms")]
    pub interval_ms: u64,

    /// Deadline for one batch write (milliseconds). Exceeding it discards the batch.
    #[serde(default = "default_commit_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_commit_interval_ms(),
            timeout_ms: default_commit_timeout_ms(),
        }
    }
}

impl CommitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "commit.interval_ms must be > 0".into(),
            )));
        }

        if self.timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "commit.timeout_ms must be > 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_commit_interval_ms() -> u64 {
    2000
}
fn default_commit_timeout_ms() -> u64 {
    5000
}
