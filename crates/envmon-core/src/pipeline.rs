use anyhow::Result;

use crate::Reading;

/// Destination for batches of accepted readings (time-series store, files)
///
/// A failed write must leave nothing half-committed that a retry of the same
/// batch would corrupt; duplicate points on retry are acceptable.
#[async_trait::async_trait]
pub trait BatchSink: Send + Sync {
    fn name(&self) -> &str;

    async fn write_batch(&mut self, points: &[Reading]) -> Result<()>;
}
