use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::RECORDS_COLLECTION;
use crate::Error;
use crate::Result;

/// What to do with an update that has no cached baseline
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingBaselinePolicy {
    /// Drop the event and log it
    #[default]
    Reject,
    /// Treat the baseline as zero and apply the full `latest` value
    ZeroBaseline,
}

/// Change listener subscriptions and delta policy
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListenerConfig {
    /// Collection group spanning every records collection. Empty disables it.
    #[serde(default = "default_collection_group")]
    pub collection_group: String,

    /// Individual records collections to watch, e.g. `countries/Thailand/records`
    #[serde(default)]
    pub collections: Vec<String>,

    #[serde(default)]
    pub missing_baseline: MissingBaselinePolicy,

    /// Also queue each record's contribution under the aggregate's `parts` map
    #[serde(default = "default_track_parts")]
    pub track_parts: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            collection_group: default_collection_group(),
            collections: Vec::new(),
            missing_baseline: MissingBaselinePolicy::default(),
            track_parts: default_track_parts(),
        }
    }
}

impl ListenerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collection_group.is_empty() && self.collections.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "listener needs a collection_group or at least one collection".into(),
            )));
        }

        if self.collection_group.contains('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "collection_group {:?} must be a bare collection id",
                self.collection_group
            ))));
        }

        for path in &self.collections {
            let segments = path.split('/').count();
            if segments < 3 || segments % 2 == 0 {
                return Err(Error::Config(ConfigError::Message(format!(
                    "collection {path:?} must be a nested collection path like countries/<name>/records"
                ))));
            }
        }

        Ok(())
    }
}

fn default_collection_group() -> String {
    RECORDS_COLLECTION.to_string()
}
fn default_track_parts() -> bool {
    true
}
