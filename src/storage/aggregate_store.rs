use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;
use crate::WriteBatch;

/// Downstream store holding the per-aggregate running totals.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AggregateStore: Send + Sync + 'static {
    /// Apply every write in `batch` as a single all-or-nothing operation.
    ///
    /// Writes with `merge` set create missing fields and increment existing
    /// ones, leaving every other field on the target untouched.
    async fn commit(
        &self,
        batch: WriteBatch,
    ) -> Result<()>;
}
