use async_trait::async_trait;

use crate::error::SyncResult;
use crate::types::SyncReport;

/// Waits until replicas have exchanged everything they can reach.
///
/// Callers that need another agent's writes to be visible await this
/// between the write and the read; the ledger itself never waits.
#[async_trait]
pub trait SyncBarrier: Send + Sync {
    async fn converge(&self) -> SyncResult<SyncReport>;
}
