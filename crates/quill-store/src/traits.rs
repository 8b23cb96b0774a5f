use bytes::Bytes;
use quill_types::ContentHash;

use crate::codec::EntryDocument;
use crate::error::{StoreError, StoreResult};

/// Content-addressed entry store.
///
/// Implementations must satisfy:
/// - Stored bytes are immutable; the address is computed, never supplied.
/// - Writes are idempotent (same bytes, same address, no duplicate).
/// - Concurrent reads and writes are safe.
/// - Only frames that decode as an [`EntryDocument`] are accepted.
pub trait ContentStore: Send + Sync {
    /// Store already-encoded entry bytes and return their address.
    fn put_bytes(&self, bytes: Bytes) -> StoreResult<ContentHash>;

    /// Raw encoded bytes stored under `hash`.
    fn get_bytes(&self, hash: &ContentHash) -> StoreResult<Bytes>;

    fn contains(&self, hash: &ContentHash) -> StoreResult<bool>;

    /// Number of distinct entries held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode and store a document.
    fn put(&self, document: &EntryDocument) -> StoreResult<ContentHash> {
        self.put_bytes(document.encode()?)
    }

    /// Fetch, verify, and decode the document stored under `hash`.
    fn get(&self, hash: &ContentHash) -> StoreResult<EntryDocument> {
        let bytes = self.get_bytes(hash)?;
        if !quill_crypto::DomainHasher::verify_content(&bytes, hash) {
            return Err(StoreError::HashMismatch(*hash));
        }
        Ok(EntryDocument::decode(&bytes)?)
    }
}
