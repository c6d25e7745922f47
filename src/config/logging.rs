use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// When set, logs go to `<log_dir>/delta-tally.log` instead of stdout
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            Error::Config(ConfigError::Message(format!(
                "logging.level {:?} is not a valid filter: {e}",
                self.level
            )))
        })?;
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
