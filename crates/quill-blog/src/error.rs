use thiserror::Error;

use quill_ledger::LedgerError;
use quill_store::CodecError;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("invalid {entry}: {reason}")]
    Invalid { entry: &'static str, reason: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl BlogError {
    /// `true` if the failure was something missing locally.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::NotFound(_)))
    }
}

pub type BlogResult<T> = Result<T, BlogError>;
