//! Revision chains.
//!
//! Each chain is a tree of revisions rooted at the create action: every
//! update names its `previous`, and concurrent updates of the same revision
//! produce siblings. Chains lock independently, so writers on different
//! entries never contend. A revision becomes visible to readers only once
//! its membership entry is published, after the chain itself holds it.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use tracing::debug;

use quill_types::{ActionId, AgentId, ContentHash, Timestamp};

use crate::action::{Action, SignedAction};
use crate::error::{LedgerError, LedgerResult, Missing};
use crate::records::ChainStatus;
use crate::shard::Sharded;

/// Revision metadata. The entry itself lives in the content store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionNode {
    pub action_id: ActionId,
    pub original: ActionId,
    pub previous: Option<ActionId>,
    pub author: AgentId,
    pub timestamp: Timestamp,
    pub entry_type: String,
    pub entry_hash: ContentHash,
}

impl RevisionNode {
    /// Node for a create or update action; `None` for anything else.
    pub fn from_action(signed: &SignedAction) -> Option<Self> {
        let (original, previous, entry_type, entry_hash) = match &signed.action {
            Action::Create {
                entry_type,
                entry_hash,
            } => (signed.id, None, entry_type, entry_hash),
            Action::Update {
                original,
                previous,
                entry_type,
                entry_hash,
            } => (*original, Some(*previous), entry_type, entry_hash),
            _ => return None,
        };
        Some(Self {
            action_id: signed.id,
            original,
            previous,
            author: *signed.author(),
            timestamp: signed.timestamp(),
            entry_type: entry_type.clone(),
            entry_hash: *entry_hash,
        })
    }

    fn order_key(&self) -> (Timestamp, ActionId) {
        (self.timestamp, self.action_id)
    }
}

/// Checks applied when appending to a chain.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AppendRules {
    /// `previous` must have no successor yet.
    pub reject_stale: bool,
    /// The updater must be the chain's original author.
    pub enforce_author: bool,
}

struct Chain {
    original: ActionId,
    nodes: HashMap<ActionId, RevisionNode>,
    successors: HashMap<ActionId, Vec<ActionId>>,
}

impl Chain {
    fn new(root: RevisionNode) -> Self {
        let original = root.action_id;
        let mut nodes = HashMap::new();
        nodes.insert(original, root);
        Self {
            original,
            nodes,
            successors: HashMap::new(),
        }
    }

    fn owner(&self) -> Option<AgentId> {
        self.nodes.get(&self.original).map(|n| n.author)
    }

    fn node(&self, id: &ActionId) -> LedgerResult<&RevisionNode> {
        self.nodes
            .get(id)
            .ok_or(LedgerError::NotFound(Missing::Action(*id)))
    }

    fn is_head(&self, id: &ActionId) -> bool {
        self.successors.get(id).map_or(true, Vec::is_empty)
    }

    fn insert(&mut self, node: RevisionNode) {
        if let Some(previous) = node.previous {
            self.successors
                .entry(previous)
                .or_default()
                .push(node.action_id);
        }
        self.nodes.insert(node.action_id, node);
    }

    fn sort_by_order(&self, ids: &mut [ActionId]) {
        ids.sort_by_key(|id| self.nodes.get(id).map(RevisionNode::order_key));
    }

    /// Heads reachable forward from `start`, oldest first.
    fn heads_from(&self, start: &ActionId) -> Vec<ActionId> {
        let mut heads = Vec::new();
        let mut queue: VecDeque<ActionId> = VecDeque::from([*start]);
        while let Some(current) = queue.pop_front() {
            match self.successors.get(&current) {
                Some(next) if !next.is_empty() => queue.extend(next.iter().copied()),
                _ => heads.push(current),
            }
        }
        self.sort_by_order(&mut heads);
        heads
    }

    /// Every head of the chain, oldest first. More than one means a fork.
    fn heads(&self) -> Vec<ActionId> {
        self.heads_from(&self.original)
    }

    /// The single head, or `Err` with all heads when the chain is forked.
    fn sole_head(&self) -> Result<ActionId, Vec<ActionId>> {
        match self.heads().as_slice() {
            [head] => Ok(*head),
            heads => Err(heads.to_vec()),
        }
    }

    fn walk_back(&self, start: &ActionId) -> ActionId {
        let mut current = *start;
        while let Some(previous) = self.nodes.get(&current).and_then(|n| n.previous) {
            current = previous;
        }
        current
    }

    /// Every revision, parents before children; siblings by timestamp, then id.
    fn topological(&self) -> Vec<RevisionNode> {
        let mut ready: BTreeSet<(Timestamp, ActionId)> = BTreeSet::new();
        if let Some(root) = self.nodes.get(&self.original) {
            ready.insert(root.order_key());
        }
        let mut ordered = Vec::with_capacity(self.nodes.len());
        while let Some((_, id)) = ready.pop_first() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            ordered.push(node.clone());
            for child in self.successors.get(&id).into_iter().flatten() {
                if let Some(child) = self.nodes.get(child) {
                    ready.insert(child.order_key());
                }
            }
        }
        ordered
    }
}

/// Index of every revision chain known to a replica.
pub struct RevisionChains {
    chains: Sharded<ActionId, Arc<RwLock<Chain>>>,
    /// Any revision id → the original of its chain.
    membership: Sharded<ActionId, ActionId>,
    by_content: Sharded<ContentHash, Vec<ActionId>>,
}

impl RevisionChains {
    pub fn new(shard_count: usize) -> Self {
        Self {
            chains: Sharded::new(shard_count),
            membership: Sharded::new(shard_count),
            by_content: Sharded::new(shard_count),
        }
    }

    /// Number of chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &ActionId) -> bool {
        self.membership.contains(id)
    }

    /// Start a chain at `root`. Returns `false` if it already exists.
    pub fn open(&self, root: RevisionNode) -> LedgerResult<bool> {
        if root.previous.is_some() || root.original != root.action_id {
            return Err(LedgerError::Validation(format!(
                "revision {} is not a chain root",
                root.action_id.short_hex()
            )));
        }
        let id = root.action_id;
        let entry_hash = root.entry_hash;
        if !self
            .chains
            .insert_if_absent(id, Arc::new(RwLock::new(Chain::new(root))))
        {
            return Ok(false);
        }
        self.membership.insert_if_absent(id, id);
        self.by_content.update(entry_hash, |ids| ids.push(id));
        debug!(original = %id.short_hex(), "opened revision chain");
        Ok(true)
    }

    /// Append an update. Returns `false` if the revision is already present.
    pub(crate) fn append(&self, node: RevisionNode, rules: AppendRules) -> LedgerResult<bool> {
        let previous = node.previous.ok_or_else(|| {
            LedgerError::Validation(format!(
                "update {} names no previous revision",
                node.action_id.short_hex()
            ))
        })?;
        let chain = self.chain_of(&previous)?;
        let mut chain = chain.write().expect("chain lock poisoned");

        if chain.original != node.original {
            return Err(LedgerError::Validation(format!(
                "update {} names original {} but {} belongs to {}",
                node.action_id.short_hex(),
                node.original.short_hex(),
                previous.short_hex(),
                chain.original.short_hex()
            )));
        }
        if chain.nodes.contains_key(&node.action_id) {
            return Ok(false);
        }
        if rules.enforce_author {
            if let Some(owner) = chain.owner() {
                if owner != node.author {
                    return Err(LedgerError::Unauthorized {
                        author: node.author,
                        owner,
                    });
                }
            }
        }
        if rules.reject_stale && !chain.is_head(&previous) {
            return Err(LedgerError::StaleReference {
                given: previous,
                heads: chain.heads(),
            });
        }

        let id = node.action_id;
        let entry_hash = node.entry_hash;
        let original = chain.original;
        chain.insert(node);
        self.membership.insert_if_absent(id, original);
        drop(chain);

        self.by_content.update(entry_hash, |ids| ids.push(id));
        debug!(
            revision = %id.short_hex(),
            previous = %previous.short_hex(),
            original = %original.short_hex(),
            "appended revision"
        );
        Ok(true)
    }

    fn chain_of(&self, id: &ActionId) -> LedgerResult<Arc<RwLock<Chain>>> {
        self.membership
            .get(id)
            .and_then(|original| self.chains.get(&original))
            .ok_or(LedgerError::NotFound(Missing::Action(*id)))
    }

    fn with_chain<R>(
        &self,
        id: &ActionId,
        f: impl FnOnce(&Chain) -> LedgerResult<R>,
    ) -> LedgerResult<R> {
        let chain = self.chain_of(id)?;
        let chain = chain.read().expect("chain lock poisoned");
        // The node must be in the chain: membership is published after insert.
        chain.node(id)?;
        f(&*chain)
    }

    pub fn node(&self, id: &ActionId) -> LedgerResult<RevisionNode> {
        self.with_chain(id, |chain| chain.node(id).cloned())
    }

    /// Author of the chain's original revision.
    pub fn owner(&self, id: &ActionId) -> LedgerResult<AgentId> {
        self.with_chain(id, |chain| {
            chain
                .owner()
                .ok_or(LedgerError::NotFound(Missing::Action(chain.original)))
        })
    }

    /// Head of the chain containing `id`, or `Conflict` if the chain is
    /// forked anywhere, whichever member `id` names.
    pub fn latest(&self, id: &ActionId) -> LedgerResult<RevisionNode> {
        self.with_chain(id, |chain| match chain.sole_head() {
            Ok(latest) => chain.node(&latest).cloned(),
            Err(heads) => Err(LedgerError::Conflict { heads }),
        })
    }

    pub fn original(&self, id: &ActionId) -> LedgerResult<RevisionNode> {
        self.with_chain(id, |chain| chain.node(&chain.walk_back(id)).cloned())
    }

    /// Every revision in the chain containing `id`, original first.
    pub fn all(&self, id: &ActionId) -> LedgerResult<Vec<RevisionNode>> {
        self.with_chain(id, |chain| Ok(chain.topological()))
    }

    /// Every head of the chain containing `id`, oldest first.
    pub fn heads(&self, id: &ActionId) -> LedgerResult<Vec<RevisionNode>> {
        self.with_chain(id, |chain| {
            chain
                .heads()
                .iter()
                .map(|h| chain.node(h).cloned())
                .collect()
        })
    }

    pub fn status(&self, id: &ActionId) -> LedgerResult<ChainStatus> {
        self.with_chain(id, |chain| {
            Ok(match chain.sole_head() {
                Ok(latest) => ChainStatus::Linear { latest },
                Err(heads) => ChainStatus::Forked { heads },
            })
        })
    }

    /// Originals of every chain holding a revision with this content.
    pub fn originals_for_content(&self, hash: &ContentHash) -> Vec<ActionId> {
        let members = self.by_content.get(hash).unwrap_or_default();
        let originals: BTreeSet<ActionId> = members
            .iter()
            .filter_map(|m| self.membership.get(m))
            .collect();
        originals.into_iter().collect()
    }
}
