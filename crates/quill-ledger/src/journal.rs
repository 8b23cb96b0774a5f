use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use quill_types::{ActionId, AgentId};

use crate::action::{ActionRecord, SignedAction};

/// Append-only log of every action this replica has applied.
///
/// Peers read it by cursor (an index into the log), so a record's position
/// never changes once written.
pub struct Journal {
    inner: RwLock<JournalState>,
}

#[derive(Default)]
struct JournalState {
    records: Vec<ActionRecord>,
    positions: HashMap<ActionId, usize>,
    /// author → seq → position
    source_chains: HashMap<AgentId, BTreeMap<u64, usize>>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(JournalState::default()),
        }
    }

    /// Append a record. Returns `false` if its action is already journaled.
    pub fn append(&self, record: ActionRecord) -> bool {
        let mut state = self.inner.write().expect("lock poisoned");
        let id = record.id();
        if state.positions.contains_key(&id) {
            return false;
        }
        let position = state.records.len();
        let author = *record.action.author();
        let seq = record.action.header.seq;
        state.positions.insert(id, position);
        state
            .source_chains
            .entry(author)
            .or_default()
            .entry(seq)
            .or_insert(position);
        state.records.push(record);
        true
    }

    pub fn contains(&self, id: &ActionId) -> bool {
        self.inner
            .read()
            .expect("lock poisoned")
            .positions
            .contains_key(id)
    }

    pub fn get(&self, id: &ActionId) -> Option<ActionRecord> {
        let state = self.inner.read().expect("lock poisoned");
        state
            .positions
            .get(id)
            .map(|&position| state.records[position].clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records at or after `cursor`, plus the cursor to resume from.
    pub fn since(&self, cursor: usize) -> (Vec<ActionRecord>, usize) {
        let state = self.inner.read().expect("lock poisoned");
        let start = cursor.min(state.records.len());
        (state.records[start..].to_vec(), state.records.len())
    }

    /// The author's latest action: `(seq, id)`.
    pub fn author_head(&self, author: &AgentId) -> Option<(u64, ActionId)> {
        let state = self.inner.read().expect("lock poisoned");
        let (&seq, &position) = state.source_chains.get(author)?.last_key_value()?;
        Some((seq, state.records[position].id()))
    }

    /// The author's actions in seq order.
    pub fn source_chain(&self, author: &AgentId) -> Vec<SignedAction> {
        let state = self.inner.read().expect("lock poisoned");
        state
            .source_chains
            .get(author)
            .map(|chain| {
                chain
                    .values()
                    .map(|&position| state.records[position].action.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}
