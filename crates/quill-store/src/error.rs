use quill_types::ContentHash;

/// Errors from encoding or decoding entry documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("frame too short: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("{extra} trailing bytes after frame")]
    TrailingBytes { extra: usize },

    #[error("unsupported codec version {0}")]
    UnsupportedVersion(u8),

    #[error("entry of {size} bytes exceeds limit of {max}")]
    EntryTooLarge { size: usize, max: usize },

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is {found}, expected {expected}")]
    WrongFieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("entry type is `{found}`, expected `{expected}`")]
    WrongEntryType { expected: String, found: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing stored under this address (possibly not yet replicated).
    #[error("content not found: {0:?}")]
    NotFound(ContentHash),

    /// Stored bytes no longer hash to their address.
    #[error("hash mismatch for {0:?}: stored bytes are corrupt")]
    HashMismatch(ContentHash),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
