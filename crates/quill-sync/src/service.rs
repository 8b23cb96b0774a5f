use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::barrier::SyncBarrier;
use crate::error::{SyncError, SyncResult};
use crate::types::SyncReport;

enum SyncRequest {
    Converge {
        reply: oneshot::Sender<SyncResult<SyncReport>>,
    },
}

/// Runs a barrier on its own task, fed by a channel.
pub struct SyncService;

impl SyncService {
    /// Spawn the service. It stops once every handle is dropped.
    pub fn spawn(barrier: Arc<dyn SyncBarrier>, capacity: usize) -> (SyncHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<SyncRequest>(capacity.max(1));
        let task = tokio::spawn(async move {
            info!("sync service started");
            while let Some(request) = rx.recv().await {
                match request {
                    SyncRequest::Converge { reply } => {
                        let result = barrier.converge().await;
                        if reply.send(result).is_err() {
                            debug!("sync requester went away before the reply");
                        }
                    }
                }
            }
            info!("sync service stopped");
        });
        (SyncHandle { tx }, task)
    }
}

/// Cheap, cloneable handle to a running [`SyncService`].
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncRequest>,
}

impl SyncHandle {
    /// Ask the service to converge every replica and wait for the report.
    pub async fn dht_sync(&self) -> SyncResult<SyncReport> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SyncRequest::Converge { reply })
            .await
            .map_err(|_| SyncError::ServiceStopped)?;
        response.await.map_err(|_| SyncError::ServiceStopped)?
    }
}

#[async_trait]
impl SyncBarrier for SyncHandle {
    async fn converge(&self) -> SyncResult<SyncReport> {
        self.dht_sync().await
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
