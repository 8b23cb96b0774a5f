use thiserror::Error;

use crate::types::PeerId;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("no fixpoint after {rounds} rounds ({pending} records still pending)")]
    Stalled { rounds: usize, pending: usize },

    #[error("sync service stopped")]
    ServiceStopped,

    #[error("ledger error: {0}")]
    Ledger(#[from] quill_ledger::LedgerError),
}

pub type SyncResult<T> = Result<T, SyncError>;
