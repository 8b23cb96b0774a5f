use tracing::debug;

use quill_types::{ActionId, EntryRef};

use crate::records::{LinkEdge, LinkFilter};
use crate::shard::Sharded;

/// Link edges indexed by base, plus an id → base lookup.
///
/// Edges for a base are kept sorted by `(timestamp, action_id)`. Deletion is
/// recorded in the tombstone index; edges themselves are never removed.
pub struct LinkIndex {
    by_base: Sharded<EntryRef, Vec<LinkEdge>>,
    base_of: Sharded<ActionId, EntryRef>,
}

impl LinkIndex {
    pub fn new(shard_count: usize) -> Self {
        Self {
            by_base: Sharded::new(shard_count),
            base_of: Sharded::new(shard_count),
        }
    }

    /// Add an edge. Returns `false` if it was already indexed.
    pub fn insert(&self, edge: LinkEdge) -> bool {
        let id = edge.action_id;
        let base = edge.base;
        let inserted = self.by_base.update(base, |edges| {
            if edges.iter().any(|e| e.action_id == id) {
                return false;
            }
            let key = (edge.timestamp, edge.action_id);
            let at = edges.partition_point(|e| (e.timestamp, e.action_id) < key);
            edges.insert(at, edge);
            true
        });
        if inserted {
            self.base_of.insert_if_absent(id, base);
            debug!(link = %id.short_hex(), base = %base, "indexed link");
        }
        inserted
    }

    pub fn contains(&self, id: &ActionId) -> bool {
        self.base_of.contains(id)
    }

    pub fn get(&self, id: &ActionId) -> Option<LinkEdge> {
        let base = self.base_of.get(id)?;
        self.by_base.read(&base, |edges| {
            edges.and_then(|edges| edges.iter().find(|e| e.action_id == *id).cloned())
        })
    }

    /// Every edge on `base` that passes `filter`, deleted or not.
    pub fn edges(&self, base: &EntryRef, filter: &LinkFilter) -> Vec<LinkEdge> {
        self.by_base.read(base, |edges| {
            edges
                .into_iter()
                .flatten()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect()
        })
    }
}
