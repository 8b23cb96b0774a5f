use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;

use quill_crypto::DomainHasher;
use quill_types::ContentHash;

use crate::codec::EntryDocument;
use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests, simulations, and embedding. Buffers are `Bytes`, so
/// reads hand out cheap clones of the stored frame.
pub struct InMemoryContentStore {
    entries: RwLock<HashMap<ContentHash, Bytes>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put_bytes(&self, bytes: Bytes) -> StoreResult<ContentHash> {
        EntryDocument::decode(&bytes)?;
        let hash = DomainHasher::content_hash(&bytes);
        let mut map = self.entries.write().expect("lock poisoned");
        map.entry(hash).or_insert_with(|| {
            debug!(hash = %hash.short_hex(), len = bytes.len(), "stored entry");
            bytes
        });
        Ok(hash)
    }

    fn get_bytes(&self, hash: &ContentHash) -> StoreResult<Bytes> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(hash).cloned().ok_or(StoreError::NotFound(*hash))
    }

    fn contains(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.entries.read().expect("lock poisoned").contains_key(hash))
    }

    fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
