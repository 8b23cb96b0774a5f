use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use quill_types::{ActionId, AgentId, ContentHash, EntryRef};

/// Keys that pick a shard from their leading byte.
pub(crate) trait ShardKey {
    fn shard_byte(&self) -> u8;
}

impl ShardKey for ActionId {
    fn shard_byte(&self) -> u8 {
        self.as_bytes()[0]
    }
}

impl ShardKey for ContentHash {
    fn shard_byte(&self) -> u8 {
        self.as_bytes()[0]
    }
}

impl ShardKey for AgentId {
    fn shard_byte(&self) -> u8 {
        self.as_bytes()[0]
    }
}

impl ShardKey for EntryRef {
    fn shard_byte(&self) -> u8 {
        self.first_byte()
    }
}

/// A map split across independently locked shards.
///
/// Keys are uniformly distributed hashes, so their first byte spreads load
/// evenly. No method holds more than one shard lock at a time.
pub(crate) struct Sharded<K, V> {
    shards: Vec<RwLock<HashMap<K, V>>>,
}

impl<K: ShardKey + Eq + Hash, V> Sharded<K, V> {
    pub fn new(count: usize) -> Self {
        let count = count.clamp(1, 256);
        Self {
            shards: (0..count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, key: &K) -> &RwLock<HashMap<K, V>> {
        &self.shards[key.shard_byte() as usize % self.shards.len()]
    }

    /// Run `f` against the value under a read lock.
    pub fn read<R>(&self, key: &K, f: impl FnOnce(Option<&V>) -> R) -> R {
        let shard = self.shard(key).read().expect("shard lock poisoned");
        f(shard.get(key))
    }

    /// Run `f` against the value under a write lock, inserting a default first.
    pub fn update<R>(&self, key: K, f: impl FnOnce(&mut V) -> R) -> R
    where
        V: Default,
    {
        let mut shard = self.shard(&key).write().expect("shard lock poisoned");
        f(shard.entry(key).or_default())
    }

    /// Insert unless present. Returns `true` if inserted.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut shard = self.shard(&key).write().expect("shard lock poisoned");
        if shard.contains_key(&key) {
            return false;
        }
        shard.insert(key, value);
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.read(key, |v| v.is_some())
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().expect("shard lock poisoned").len())
            .sum()
    }
}

impl<K: ShardKey + Eq + Hash, V: Clone> Sharded<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.read(key, |v| v.cloned())
    }
}
