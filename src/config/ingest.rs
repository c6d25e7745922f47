use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Category;
use crate::Result;

/// Optional startup ingestion of a JSON seed file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    #[serde(default = "default_category")]
    pub category: Category,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            category: default_category(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.seed_path {
            if !path.is_file() {
                return Err(crate::Error::Config(config::ConfigError::Message(format!(
                    "ingest.seed_path {} is not a file",
                    path.display()
                ))));
            }
        }
        Ok(())
    }
}

fn default_category() -> Category {
    Category::Confirmed
}
