use tracing::debug;

use quill_types::ActionId;

use crate::records::Tombstone;
use crate::shard::Sharded;

/// Tombstones grouped by the action they delete.
///
/// Each target's list is kept sorted by `(timestamp, action_id)`, so the
/// oldest delete is always first and every replica agrees on the order.
pub struct TombstoneIndex {
    by_target: Sharded<ActionId, Vec<Tombstone>>,
}

impl TombstoneIndex {
    pub fn new(shard_count: usize) -> Self {
        Self {
            by_target: Sharded::new(shard_count),
        }
    }

    /// Record a tombstone. Returns `false` if it was already recorded.
    pub fn record(&self, tombstone: Tombstone) -> bool {
        let target = tombstone.target;
        let id = tombstone.action_id;
        let inserted = self.by_target.update(target, |list| {
            if list.iter().any(|t| t.action_id == id) {
                return false;
            }
            let key = (tombstone.timestamp, tombstone.action_id);
            let at = list.partition_point(|t| (t.timestamp, t.action_id) < key);
            list.insert(at, tombstone);
            true
        });
        if inserted {
            debug!(target = %target.short_hex(), delete = %id.short_hex(), "recorded tombstone");
        }
        inserted
    }

    pub fn oldest(&self, target: &ActionId) -> Option<Tombstone> {
        self.by_target
            .read(target, |list| list.and_then(|l| l.first().cloned()))
    }

    pub fn all(&self, target: &ActionId) -> Vec<Tombstone> {
        self.by_target.get(target).unwrap_or_default()
    }

    pub fn is_deleted(&self, target: &ActionId) -> bool {
        self.by_target
            .read(target, |list| list.map_or(false, |l| !l.is_empty()))
    }
}
