use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Category;
use crate::RawLocation;
use crate::Result;

/// Upstream provider of per-category location readings.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LocationSource: Send + Sync + 'static {
    async fn fetch_category(
        &self,
        category: Category,
    ) -> Result<Vec<RawLocation>>;
}
