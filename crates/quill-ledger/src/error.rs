use quill_store::{CodecError, StoreError};
use quill_types::{ActionId, AgentId, ContentHash};

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// No revision, tombstone target, or link with this action id.
    Action(ActionId),
    /// No stored content under this hash.
    Content(ContentHash),
    /// No link-create action with this id.
    Link(ActionId),
    /// The target exists but has never been deleted.
    Delete(ActionId),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(id) => write!(f, "action {}", id.short_hex()),
            Self::Content(hash) => write!(f, "content {}", hash.short_hex()),
            Self::Link(id) => write!(f, "link {}", id.short_hex()),
            Self::Delete(id) => write!(f, "delete of {}", id.short_hex()),
        }
    }
}

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Referenced item is absent locally. May be transient under replication.
    #[error("not found: {0}")]
    NotFound(Missing),

    /// An update named a revision that already has a successor.
    #[error("stale reference: {} is not the latest revision", given.short_hex())]
    StaleReference { given: ActionId, heads: Vec<ActionId> },

    /// The chain forked; there is no single latest revision.
    #[error("chain has {} concurrent heads", heads.len())]
    Conflict { heads: Vec<ActionId> },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {author} may not modify data owned by {owner}")]
    Unauthorized { author: AgentId, owner: AgentId },

    /// A replicated action arrived before something it depends on.
    #[error("missing dependency: {0}")]
    MissingDependency(Missing),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),
}

impl LedgerError {
    /// `true` if retrying after replicas converge may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MissingDependency(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(hash) => Self::NotFound(Missing::Content(hash)),
            StoreError::Codec(codec) => Self::Validation(codec.to_string()),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<CodecError> for LedgerError {
    fn from(err: CodecError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
