use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::Category;
use crate::LocationSource;
use crate::RawLocation;
use crate::Result;

/// Locations read from a JSON document of the form
/// `{"confirmed": [..], "deaths": [..], "recovered": [..]}`.
///
/// Missing categories read as empty.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    locations: HashMap<Category, Vec<RawLocation>>,
}

impl JsonFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let source = Self::from_json(&content)?;
        debug!("loaded seed data from {}", path.display());
        Ok(source)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let locations: HashMap<Category, Vec<RawLocation>> = serde_json::from_str(content)?;
        Ok(Self { locations })
    }
}

#[async_trait]
impl LocationSource for JsonFileSource {
    async fn fetch_category(
        &self,
        category: Category,
    ) -> Result<Vec<RawLocation>> {
        Ok(self.locations.get(&category).cloned().unwrap_or_default())
    }
}
