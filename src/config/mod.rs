//! Configuration management for the aggregation engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod commit;
mod ingest;
mod listener;
mod logging;
mod retry;
use std::env;
use std::fmt::Debug;

pub use commit::*;
use config::Config;
use config::Environment;
use config::File;
pub use ingest::*;
pub use listener::*;
pub use logging::*;
pub use retry::*;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ENV_PREFIX;
use crate::Result;


/// Main configuration container for the aggregation engine
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables prefixed `TALLY__` (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct EngineConfig {
    /// Batch committer timing
    #[serde(default)]
    pub commit: CommitConfig,
    /// Change stream subscriptions and delta policy
    #[serde(default)]
    pub listener: ListenerConfig,
    /// Retry policies for stream reconnects
    #[serde(default)]
    pub retry: RetryPolicies,
    /// Log filter and optional file output
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Startup ingestion
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Debug for EngineConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("commit", &self.commit)
            .field("listener", &self.listener)
            .finish()
    }
}

impl EngineConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `TALLY__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be layered with
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("TALLY__COMMIT__INTERVAL_MS", "500");
    /// let cfg = EngineConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.commit.validate()?;
        self.listener.validate()?;
        self.retry.validate()?;
        self.logging.validate()?;
        self.ingest.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
