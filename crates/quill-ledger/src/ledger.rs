use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::{debug, warn};

use quill_crypto::{AgentKey, DomainHasher, SourceChainVerifier};
use quill_store::{ContentStore, EntryDocument, InMemoryContentStore};
use quill_types::{ActionId, AgentId, EntryRef, HybridClock};

use crate::action::{Action, ActionHeader, ActionRecord, SignedAction};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult, Missing};
use crate::journal::Journal;
use crate::links::LinkIndex;
use crate::records::{ChainStatus, LinkEdge, LinkFilter, Revision, Tombstone};
use crate::revisions::{AppendRules, RevisionChains, RevisionNode};
use crate::shard::Sharded;
use crate::tombstones::TombstoneIndex;

/// Where an action being applied came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Local,
    Replica,
}

impl Origin {
    /// Absence is an error locally and a retryable gap for replicated actions.
    fn missing(self, what: Missing) -> LedgerError {
        match self {
            Self::Local => LedgerError::NotFound(what),
            Self::Replica => LedgerError::MissingDependency(what),
        }
    }
}

/// One replica's view of every chain, tombstone, and link.
///
/// All writes go through signed actions. A write is applied to the indexes
/// first and journaled second, so anything a peer can read from the journal
/// is already visible locally. Writes by one author are serialized to keep
/// their source chain linear; writes by different authors only contend when
/// they touch the same chain or index shard.
pub struct Ledger {
    config: LedgerConfig,
    store: Arc<dyn ContentStore>,
    clock: HybridClock,
    revisions: RevisionChains,
    tombstones: TombstoneIndex,
    links: LinkIndex,
    journal: Journal,
    writers: Sharded<AgentId, Arc<Mutex<()>>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn ContentStore>, config: LedgerConfig) -> Self {
        let shards = config.shard_count;
        Self {
            clock: HybridClock::new(config.node_id),
            store,
            revisions: RevisionChains::new(shards),
            tombstones: TombstoneIndex::new(shards),
            links: LinkIndex::new(shards),
            journal: Journal::new(),
            writers: Sharded::new(shards),
            config,
        }
    }

    /// A ledger over a fresh in-memory content store.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(Arc::new(InMemoryContentStore::new()), config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Number of revision chains.
    pub fn chain_count(&self) -> usize {
        self.revisions.len()
    }

    // ---------------------------------------------------------------
    // Revision chains
    // ---------------------------------------------------------------

    /// Store `entry` and start a new chain with it.
    pub fn create_chain(&self, entry: &EntryDocument, author: &AgentKey) -> LedgerResult<ActionId> {
        let bytes = entry.encode()?;
        let entry_hash = self.store.put_bytes(bytes.clone())?;
        self.commit(
            author,
            Action::Create {
                entry_type: entry.entry_type.clone(),
                entry_hash,
            },
            Some(bytes),
        )
    }

    /// Append `entry` after `previous`, which must be a head of its chain.
    pub fn update(
        &self,
        previous: &ActionId,
        entry: &EntryDocument,
        author: &AgentKey,
    ) -> LedgerResult<ActionId> {
        let prev = self.revisions.node(previous)?;
        if prev.entry_type != entry.entry_type {
            return Err(LedgerError::Validation(format!(
                "cannot update a {} with a {}",
                prev.entry_type, entry.entry_type
            )));
        }
        let bytes = entry.encode()?;
        let entry_hash = self.store.put_bytes(bytes.clone())?;
        self.commit(
            author,
            Action::Update {
                original: prev.original,
                previous: *previous,
                entry_type: entry.entry_type.clone(),
                entry_hash,
            },
            Some(bytes),
        )
    }

    pub fn get_revision(&self, id: &ActionId) -> LedgerResult<Revision> {
        self.materialize(self.revisions.node(id)?)
    }

    /// Head of the chain containing `id`. `Conflict` if the chain is forked.
    pub fn get_latest(&self, id: &ActionId) -> LedgerResult<Revision> {
        self.materialize(self.revisions.latest(id)?)
    }

    pub fn get_original(&self, id: &ActionId) -> LedgerResult<Revision> {
        self.materialize(self.revisions.original(id)?)
    }

    /// Every revision of the chain, original first.
    pub fn get_all_revisions(&self, id: &ActionId) -> LedgerResult<Vec<Revision>> {
        self.revisions
            .all(id)?
            .into_iter()
            .map(|node| self.materialize(node))
            .collect()
    }

    /// Every head of the chain containing `id`. More than one means a fork.
    pub fn heads(&self, id: &ActionId) -> LedgerResult<Vec<Revision>> {
        self.revisions
            .heads(id)?
            .into_iter()
            .map(|node| self.materialize(node))
            .collect()
    }

    pub fn chain_status(&self, id: &ActionId) -> LedgerResult<ChainStatus> {
        self.revisions.status(id)
    }

    /// Chain originals an entry reference denotes. A content reference
    /// matches every chain holding a revision with that content.
    pub fn resolve(&self, reference: &EntryRef) -> Vec<ActionId> {
        match reference {
            EntryRef::Action(id) => self
                .revisions
                .original(id)
                .map(|node| vec![node.action_id])
                .unwrap_or_default(),
            EntryRef::Content(hash) => self.revisions.originals_for_content(hash),
        }
    }

    fn materialize(&self, node: RevisionNode) -> LedgerResult<Revision> {
        let entry = self.store.get(&node.entry_hash)?;
        Ok(Revision {
            action_id: node.action_id,
            original: node.original,
            previous: node.previous,
            author: node.author,
            timestamp: node.timestamp,
            entry_hash: node.entry_hash,
            entry,
        })
    }

    // ---------------------------------------------------------------
    // Tombstones
    // ---------------------------------------------------------------

    /// Tombstone a revision or link. Repeated deletes are all kept.
    pub fn delete(&self, target: &ActionId, author: &AgentKey) -> LedgerResult<ActionId> {
        self.commit(author, Action::Delete { target: *target }, None)
    }

    /// Earliest tombstone on `target`.
    pub fn get_oldest_delete(&self, target: &ActionId) -> LedgerResult<Tombstone> {
        self.target_owner(target, Origin::Local)?;
        self.tombstones
            .oldest(target)
            .ok_or(LedgerError::NotFound(Missing::Delete(*target)))
    }

    /// All tombstones on `target`, oldest first. Empty if it is live.
    pub fn get_all_deletes(&self, target: &ActionId) -> LedgerResult<Vec<Tombstone>> {
        self.target_owner(target, Origin::Local)?;
        Ok(self.tombstones.all(target))
    }

    pub fn is_live(&self, target: &ActionId) -> bool {
        !self.tombstones.is_deleted(target)
    }

    /// Who may delete `target`: the chain's original author or the link's author.
    fn target_owner(&self, target: &ActionId, origin: Origin) -> LedgerResult<AgentId> {
        if self.revisions.contains(target) {
            return self.revisions.owner(target);
        }
        self.links
            .get(target)
            .map(|edge| edge.author)
            .ok_or_else(|| origin.missing(Missing::Action(*target)))
    }

    // ---------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------

    pub fn create_link(
        &self,
        base: EntryRef,
        target: ActionId,
        link_type: &str,
        tag: &str,
        author: &AgentKey,
    ) -> LedgerResult<ActionId> {
        self.commit(
            author,
            Action::CreateLink {
                base,
                target,
                link_type: link_type.to_string(),
                tag: tag.to_string(),
            },
            None,
        )
    }

    pub fn delete_link(&self, link: &ActionId, author: &AgentKey) -> LedgerResult<ActionId> {
        self.commit(author, Action::DeleteLink { link: *link }, None)
    }

    pub fn get_link(&self, id: &ActionId) -> LedgerResult<LinkEdge> {
        self.links
            .get(id)
            .ok_or(LedgerError::NotFound(Missing::Link(*id)))
    }

    /// Undeleted edges on `base`, oldest first.
    pub fn get_live_links(&self, base: &EntryRef, filter: &LinkFilter) -> Vec<LinkEdge> {
        self.links
            .edges(base, filter)
            .into_iter()
            .filter(|edge| self.is_live(&edge.action_id))
            .collect()
    }

    /// Every edge ever created on `base`, each with its tombstones.
    pub fn get_links_with_deletes(
        &self,
        base: &EntryRef,
        filter: &LinkFilter,
    ) -> Vec<(LinkEdge, Vec<Tombstone>)> {
        self.links
            .edges(base, filter)
            .into_iter()
            .map(|edge| {
                let deletes = self.tombstones.all(&edge.action_id);
                (edge, deletes)
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    fn commit(
        &self,
        key: &AgentKey,
        action: Action,
        entry: Option<Bytes>,
    ) -> LedgerResult<ActionId> {
        let author = key.agent_id();
        let writer = self.writers.update(author, |slot| Arc::clone(slot));
        let _serialized = writer.lock().expect("writer lock poisoned");

        let head = self.journal.author_head(&author);
        let header = ActionHeader {
            author,
            timestamp: self.clock.now(),
            seq: head.map_or(0, |(seq, _)| seq + 1),
            prev_action: head.map(|(_, id)| id),
        };
        let signed = SignedAction::sign(key, header, action)?;
        self.apply(&signed, Origin::Local)?;

        let id = signed.id;
        debug!(
            action = signed.action.name(),
            id = %id.short_hex(),
            author = %author.short_id(),
            seq = signed.header.seq,
            "committed action"
        );
        self.journal.append(ActionRecord {
            action: signed,
            entry,
        });
        Ok(id)
    }

    /// Apply an action to the indexes. `Ok(false)` if it was already applied.
    fn apply(&self, signed: &SignedAction, origin: Origin) -> LedgerResult<bool> {
        match &signed.action {
            Action::Create { entry_hash, .. } | Action::Update { entry_hash, .. } => {
                if !self.store.contains(entry_hash)? {
                    return Err(origin.missing(Missing::Content(*entry_hash)));
                }
                let node = RevisionNode::from_action(signed).ok_or_else(|| {
                    LedgerError::Validation(format!("{} is not a revision", signed.action.name()))
                })?;
                if node.previous.is_none() {
                    return self.revisions.open(node);
                }
                let rules = AppendRules {
                    reject_stale: origin == Origin::Local && self.config.reject_stale_updates,
                    enforce_author: self.config.enforce_original_author,
                };
                self.revisions.append(node, rules).map_err(|err| match err {
                    LedgerError::NotFound(what) => origin.missing(what),
                    other => other,
                })
            }
            Action::Delete { target } => {
                let owner = self.target_owner(target, origin)?;
                self.authorize(signed.author(), &owner)?;
                Ok(self.tombstones.record(tombstone(signed, *target)))
            }
            Action::CreateLink {
                base,
                target,
                link_type,
                tag,
            } => {
                if link_type.is_empty() {
                    return Err(LedgerError::Validation("link type must not be empty".into()));
                }
                Ok(self.links.insert(LinkEdge {
                    action_id: signed.id,
                    base: *base,
                    target: *target,
                    link_type: link_type.clone(),
                    tag: tag.clone(),
                    author: *signed.author(),
                    timestamp: signed.timestamp(),
                }))
            }
            Action::DeleteLink { link } => {
                let edge = self
                    .links
                    .get(link)
                    .ok_or_else(|| origin.missing(Missing::Link(*link)))?;
                self.authorize(signed.author(), &edge.author)?;
                Ok(self.tombstones.record(tombstone(signed, *link)))
            }
        }
    }

    fn authorize(&self, author: &AgentId, owner: &AgentId) -> LedgerResult<()> {
        if self.config.enforce_original_author && author != owner {
            return Err(LedgerError::Unauthorized {
                author: *author,
                owner: *owner,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Replication
    // ---------------------------------------------------------------

    /// Journal records from `cursor` on, and the cursor to resume from.
    pub fn records_since(&self, cursor: usize) -> (Vec<ActionRecord>, usize) {
        self.journal.since(cursor)
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    pub fn contains_action(&self, id: &ActionId) -> bool {
        self.journal.contains(id)
    }

    /// Apply a record produced by another replica.
    ///
    /// Returns `false` if the action was already known. Fails with
    /// `MissingDependency` when something it refers to has not arrived yet;
    /// the caller should retry after integrating more records.
    pub fn integrate(&self, record: ActionRecord) -> LedgerResult<bool> {
        let id = record.id();
        if self.journal.contains(&id) {
            return Ok(false);
        }
        if self.config.verify_integrated_actions {
            record.action.verify()?;
        }
        if let (Some(expected), Some(bytes)) = (record.action.action.entry_hash(), &record.entry) {
            if !DomainHasher::verify_content(bytes, expected) {
                warn!(id = %id.short_hex(), "replicated entry does not match its hash");
                return Err(LedgerError::IntegrityViolation(format!(
                    "entry for {} does not hash to {}",
                    id.short_hex(),
                    expected.short_hex()
                )));
            }
            self.store.put_bytes(bytes.clone())?;
        }
        self.clock.observe(&record.action.timestamp());

        if let Err(err) = self.apply(&record.action, Origin::Replica) {
            if err.is_transient() {
                debug!(id = %id.short_hex(), error = %err, "deferred remote action");
            }
            return Err(err);
        }
        debug!(
            action = record.action.action.name(),
            id = %id.short_hex(),
            author = %record.action.author().short_id(),
            "integrated remote action"
        );
        Ok(self.journal.append(record))
    }

    /// Check the hash links of every action `agent` authored that this
    /// replica holds. Returns the chain length.
    pub fn verify_source_chain(&self, agent: &AgentId) -> LedgerResult<usize> {
        let chain = self.journal.source_chain(agent);
        SourceChainVerifier::verify(&chain).map_err(|e| {
            LedgerError::IntegrityViolation(format!("source chain of {}: {e}", agent.short_id()))
        })
    }
}

fn tombstone(signed: &SignedAction, target: ActionId) -> Tombstone {
    Tombstone {
        action_id: signed.id,
        target,
        author: *signed.author(),
        timestamp: signed.timestamp(),
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("node_id", &self.config.node_id)
            .field("chains", &self.revisions.len())
            .field("journal_len", &self.journal.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quill_store::{FieldMap, FieldValue};

    fn ledger() -> Ledger {
        Ledger::in_memory(LedgerConfig::default())
    }

    fn note(text: &str) -> EntryDocument {
        EntryDocument::new(
            "note",
            FieldMap::new().with("text", FieldValue::Text(text.into())),
        )
    }

    fn text_of(rev: &Revision) -> String {
        rev.entry.fields.text("text").unwrap().clone()
    }

    fn replicate(from: &Ledger, to: &Ledger) {
        let (records, _) = from.records_since(0);
        for record in records {
            to.integrate(record).unwrap();
        }
    }

    #[test]
    fn create_then_read_back() {
        let l = ledger();
        let alice = AgentKey::generate();
        let id = l.create_chain(&note("v1"), &alice).unwrap();

        let original = l.get_original(&id).unwrap();
        assert_eq!(original.action_id, id);
        assert!(original.is_original());
        assert_eq!(original.author, alice.agent_id());
        assert_eq!(text_of(&original), "v1");
        assert_eq!(l.get_latest(&id).unwrap(), original);
        assert_eq!(l.chain_count(), 1);
    }

    #[test]
    fn latest_and_original_from_any_member() {
        let l = ledger();
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        let v2 = l.update(&v1, &note("v2"), &alice).unwrap();
        let v3 = l.update(&v2, &note("v3"), &alice).unwrap();

        for id in [v1, v2, v3] {
            assert_eq!(l.get_latest(&id).unwrap().action_id, v3);
            assert_eq!(l.get_original(&id).unwrap().action_id, v1);
        }
        let texts: Vec<String> = l
            .get_all_revisions(&v2)
            .unwrap()
            .iter()
            .map(text_of)
            .collect();
        assert_eq!(texts, vec!["v1", "v2", "v3"]);
        assert_eq!(l.get_revision(&v2).unwrap().previous, Some(v1));
    }

    #[test]
    fn update_of_stale_revision_rejected() {
        let l = ledger();
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        let v2 = l.update(&v1, &note("v2"), &alice).unwrap();

        let err = l.update(&v1, &note("late"), &alice).unwrap_err();
        assert_eq!(
            err,
            LedgerError::StaleReference {
                given: v1,
                heads: vec![v2]
            }
        );
        assert_eq!(l.get_all_revisions(&v1).unwrap().len(), 2);
    }

    #[test]
    fn stale_update_allowed_when_not_enforced() {
        let config = LedgerConfig {
            reject_stale_updates: false,
            ..LedgerConfig::default()
        };
        let l = Ledger::in_memory(config);
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        l.update(&v1, &note("a"), &alice).unwrap();
        l.update(&v1, &note("b"), &alice).unwrap();
        assert!(matches!(
            l.chain_status(&v1).unwrap(),
            ChainStatus::Forked { heads } if heads.len() == 2
        ));
    }

    #[test]
    fn update_of_unknown_revision_not_found() {
        let l = ledger();
        let alice = AgentKey::generate();
        let missing = ActionId::from_raw([5; 32]);
        assert_eq!(
            l.update(&missing, &note("x"), &alice).unwrap_err(),
            LedgerError::NotFound(Missing::Action(missing))
        );
    }

    #[test]
    fn update_cannot_change_entry_type() {
        let l = ledger();
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        let other = EntryDocument::new("post", FieldMap::new());
        assert!(matches!(
            l.update(&v1, &other, &alice),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let l = ledger();
        let missing = ActionId::from_raw([1; 32]);
        assert!(matches!(l.get_latest(&missing), Err(LedgerError::NotFound(_))));
        assert!(matches!(l.get_original(&missing), Err(LedgerError::NotFound(_))));
        assert!(matches!(
            l.get_all_revisions(&missing),
            Err(LedgerError::NotFound(_))
        ));
        assert!(l.get_latest(&missing).unwrap_err().is_transient());
    }

    #[test]
    fn concurrent_replicas_fork_and_report_conflict() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        let bob = AgentKey::generate();

        let v1 = a.create_chain(&note("v1"), &alice).unwrap();
        replicate(&a, &b);

        let from_alice = a.update(&v1, &note("alice"), &alice).unwrap();
        let from_bob = b.update(&v1, &note("bob"), &bob).unwrap();
        replicate(&a, &b);
        replicate(&b, &a);

        for l in [&a, &b] {
            let err = l.get_latest(&v1).unwrap_err();
            let LedgerError::Conflict { heads } = &err else {
                panic!("expected conflict, got {err:?}");
            };
            assert_eq!(heads.len(), 2);
            assert!(heads.contains(&from_alice) && heads.contains(&from_bob));
            assert_eq!(l.heads(&v1).unwrap().len(), 2);
            assert_eq!(l.get_all_revisions(&v1).unwrap().len(), 3);
        }
        assert_eq!(a.chain_status(&v1).unwrap(), b.chain_status(&v1).unwrap());
        // A branch member sees the same fork as the original.
        for head in [from_alice, from_bob] {
            assert_eq!(a.chain_status(&head).unwrap(), a.chain_status(&v1).unwrap());
            assert!(matches!(
                a.get_latest(&head),
                Err(LedgerError::Conflict { ref heads }) if heads.len() == 2
            ));
        }
        // Building on a head is allowed; the fork remains.
        a.update(&from_alice, &note("again"), &alice).unwrap();
        assert!(matches!(a.chain_status(&v1).unwrap(), ChainStatus::Forked { .. }));
    }

    #[test]
    fn delete_records_tombstones_oldest_first() {
        let l = ledger();
        let alice = AgentKey::generate();
        let bob = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        assert!(l.is_live(&v1));
        assert!(l.get_all_deletes(&v1).unwrap().is_empty());
        assert_eq!(
            l.get_oldest_delete(&v1).unwrap_err(),
            LedgerError::NotFound(Missing::Delete(v1))
        );

        let first = l.delete(&v1, &alice).unwrap();
        let second = l.delete(&v1, &bob).unwrap();

        assert!(!l.is_live(&v1));
        assert_eq!(l.get_oldest_delete(&v1).unwrap().action_id, first);
        let all: Vec<ActionId> = l
            .get_all_deletes(&v1)
            .unwrap()
            .into_iter()
            .map(|t| t.action_id)
            .collect();
        assert_eq!(all, vec![first, second]);
        // Deleted revisions stay readable.
        assert_eq!(text_of(&l.get_latest(&v1).unwrap()), "v1");
    }

    #[test]
    fn delete_of_unknown_target_not_found() {
        let l = ledger();
        let alice = AgentKey::generate();
        let missing = ActionId::from_raw([8; 32]);
        assert_eq!(
            l.delete(&missing, &alice).unwrap_err(),
            LedgerError::NotFound(Missing::Action(missing))
        );
        assert!(matches!(
            l.get_all_deletes(&missing),
            Err(LedgerError::NotFound(Missing::Action(_)))
        ));
        assert_eq!(l.journal_len(), 0);
    }

    #[test]
    fn links_live_and_deleted() {
        let l = ledger();
        let alice = AgentKey::generate();
        let post = l.create_chain(&note("post"), &alice).unwrap();
        let comment = l.create_chain(&note("comment"), &alice).unwrap();
        let base = EntryRef::Action(post);

        let link = l
            .create_link(base, comment, "post_to_comments", "", &alice)
            .unwrap();
        let live = l.get_live_links(&base, &LinkFilter::any());
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].target, comment);
        assert_eq!(l.get_link(&link).unwrap().base, base);

        let delete = l.delete_link(&link, &alice).unwrap();
        assert!(l.get_live_links(&base, &LinkFilter::any()).is_empty());
        let with_deletes = l.get_links_with_deletes(&base, &LinkFilter::any());
        assert_eq!(with_deletes.len(), 1);
        assert_eq!(with_deletes[0].0.action_id, link);
        assert_eq!(with_deletes[0].1.len(), 1);
        assert_eq!(with_deletes[0].1[0].action_id, delete);
    }

    #[test]
    fn duplicate_links_are_independent() {
        let l = ledger();
        let alice = AgentKey::generate();
        let base = EntryRef::Action(ActionId::from_raw([1; 32]));
        let target = ActionId::from_raw([2; 32]);
        let first = l.create_link(base, target, "t", "", &alice).unwrap();
        let second = l.create_link(base, target, "t", "", &alice).unwrap();
        assert_ne!(first, second);

        l.delete_link(&first, &alice).unwrap();
        let live = l.get_live_links(&base, &LinkFilter::any());
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].action_id, second);
    }

    #[test]
    fn link_filters_by_type_and_tag() {
        let l = ledger();
        let alice = AgentKey::generate();
        let base = EntryRef::Action(ActionId::from_raw([1; 32]));
        let target = ActionId::from_raw([2; 32]);
        l.create_link(base, target, "likes", "", &alice).unwrap();
        l.create_link(base, target, "comments", "2024", &alice).unwrap();
        l.create_link(base, target, "comments", "2025", &alice).unwrap();

        assert_eq!(l.get_live_links(&base, &LinkFilter::of_type("comments")).len(), 2);
        assert_eq!(
            l.get_live_links(&base, &LinkFilter::of_type("comments").with_tag_prefix("2025"))
                .len(),
            1
        );
    }

    #[test]
    fn empty_link_type_rejected() {
        let l = ledger();
        let alice = AgentKey::generate();
        let base = EntryRef::Action(ActionId::from_raw([1; 32]));
        assert!(matches!(
            l.create_link(base, ActionId::from_raw([2; 32]), "", "", &alice),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn delete_link_of_unknown_link_not_found() {
        let l = ledger();
        let alice = AgentKey::generate();
        let missing = ActionId::from_raw([3; 32]);
        assert_eq!(
            l.delete_link(&missing, &alice).unwrap_err(),
            LedgerError::NotFound(Missing::Link(missing))
        );
    }

    #[test]
    fn original_author_enforced_when_configured() {
        let config = LedgerConfig {
            enforce_original_author: true,
            ..LedgerConfig::default()
        };
        let l = Ledger::in_memory(config);
        let alice = AgentKey::generate();
        let bob = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        let link = l
            .create_link(EntryRef::Action(v1), v1, "self", "", &alice)
            .unwrap();

        let unauthorized = LedgerError::Unauthorized {
            author: bob.agent_id(),
            owner: alice.agent_id(),
        };
        assert_eq!(l.update(&v1, &note("bob"), &bob).unwrap_err(), unauthorized);
        assert_eq!(l.delete(&v1, &bob).unwrap_err(), unauthorized);
        assert_eq!(l.delete_link(&link, &bob).unwrap_err(), unauthorized);

        l.update(&v1, &note("alice"), &alice).unwrap();
        l.delete(&v1, &alice).unwrap();
    }

    #[test]
    fn resolve_by_action_and_content() {
        let l = ledger();
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        let v2 = l.update(&v1, &note("v2"), &alice).unwrap();

        assert_eq!(l.resolve(&EntryRef::Action(v2)), vec![v1]);
        let hash = note("v2").content_hash().unwrap();
        assert_eq!(l.resolve(&EntryRef::Content(hash)), vec![v1]);
        assert!(l
            .resolve(&EntryRef::Action(ActionId::from_raw([0; 32])))
            .is_empty());
    }

    #[test]
    fn replica_converges_to_same_state() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        let v1 = a.create_chain(&note("v1"), &alice).unwrap();
        let v2 = a.update(&v1, &note("v2"), &alice).unwrap();
        let link = a
            .create_link(EntryRef::Action(v1), v2, "t", "", &alice)
            .unwrap();
        a.delete_link(&link, &alice).unwrap();
        a.delete(&v2, &alice).unwrap();

        replicate(&a, &b);

        assert_eq!(b.get_latest(&v1).unwrap(), a.get_latest(&v1).unwrap());
        assert_eq!(b.get_all_deletes(&v2).unwrap(), a.get_all_deletes(&v2).unwrap());
        assert_eq!(
            b.get_links_with_deletes(&EntryRef::Action(v1), &LinkFilter::any()),
            a.get_links_with_deletes(&EntryRef::Action(v1), &LinkFilter::any())
        );
        assert_eq!(b.journal_len(), a.journal_len());
        assert_eq!(b.verify_source_chain(&alice.agent_id()), Ok(5));
    }

    #[test]
    fn integrate_is_idempotent() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        a.create_chain(&note("v1"), &alice).unwrap();
        let (records, _) = a.records_since(0);
        assert!(b.integrate(records[0].clone()).unwrap());
        assert!(!b.integrate(records[0].clone()).unwrap());
        assert_eq!(b.journal_len(), 1);
    }

    #[test]
    fn integrate_out_of_order_defers_until_dependency_arrives() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        let v1 = a.create_chain(&note("v1"), &alice).unwrap();
        a.update(&v1, &note("v2"), &alice).unwrap();
        let (records, _) = a.records_since(0);

        let err = b.integrate(records[1].clone()).unwrap_err();
        assert_eq!(err, LedgerError::MissingDependency(Missing::Action(v1)));
        assert!(err.is_transient());
        assert_eq!(b.journal_len(), 0);

        assert!(b.integrate(records[0].clone()).unwrap());
        assert!(b.integrate(records[1].clone()).unwrap());
        assert_eq!(text_of(&b.get_latest(&v1).unwrap()), "v2");
    }

    #[test]
    fn integrate_rejects_tampered_action() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        a.create_chain(&note("v1"), &alice).unwrap();
        let (mut records, _) = a.records_since(0);
        let mut record = records.remove(0);
        record.action.header.seq = 7;
        assert!(matches!(
            b.integrate(record),
            Err(LedgerError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn integrate_rejects_swapped_entry_bytes() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        a.create_chain(&note("v1"), &alice).unwrap();
        let (mut records, _) = a.records_since(0);
        let mut record = records.remove(0);
        record.entry = Some(note("forged").encode().unwrap());
        assert!(matches!(
            b.integrate(record),
            Err(LedgerError::IntegrityViolation(_))
        ));
        assert!(b.store().is_empty());
    }

    #[test]
    fn integrate_without_entry_bytes_defers() {
        let a = ledger();
        let b = ledger();
        let alice = AgentKey::generate();
        a.create_chain(&note("v1"), &alice).unwrap();
        let (mut records, _) = a.records_since(0);
        let mut record = records.remove(0);
        record.entry = None;
        assert!(matches!(
            b.integrate(record),
            Err(LedgerError::MissingDependency(Missing::Content(_)))
        ));
    }

    #[test]
    fn records_since_resumes_from_cursor() {
        let l = ledger();
        let alice = AgentKey::generate();
        l.create_chain(&note("a"), &alice).unwrap();
        let (first, cursor) = l.records_since(0);
        assert_eq!(first.len(), 1);
        l.create_chain(&note("b"), &alice).unwrap();
        let (rest, cursor) = l.records_since(cursor);
        assert_eq!(rest.len(), 1);
        assert_eq!(cursor, 2);
        assert!(l.contains_action(&rest[0].id()));
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let l = ledger();
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        l.update(&v1, &note("v2"), &alice).unwrap();
        let before = l.journal_len();
        assert!(l.update(&v1, &note("stale"), &alice).is_err());
        assert_eq!(l.journal_len(), before);
        // The next write still links to the last successful one.
        l.create_chain(&note("next"), &alice).unwrap();
        assert_eq!(l.verify_source_chain(&alice.agent_id()), Ok(3));
    }

    #[test]
    fn concurrent_writers_keep_source_chain_linear() {
        use std::thread;

        let l = Arc::new(ledger());
        let alice = Arc::new(AgentKey::generate());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let l = Arc::clone(&l);
                let alice = Arc::clone(&alice);
                thread::spawn(move || l.create_chain(&note(&format!("n{i}")), &alice).unwrap())
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(l.chain_count(), 8);
        assert_eq!(l.verify_source_chain(&alice.agent_id()), Ok(8));
    }

    #[test]
    fn concurrent_updates_of_one_revision_admit_one() {
        use std::thread;

        let l = Arc::new(ledger());
        let alice = AgentKey::generate();
        let v1 = l.create_chain(&note("v1"), &alice).unwrap();
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let l = Arc::clone(&l);
                thread::spawn(move || {
                    let key = AgentKey::generate();
                    l.update(&v1, &note(&format!("u{i}")), &key).is_ok()
                })
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
        assert!(matches!(l.chain_status(&v1).unwrap(), ChainStatus::Linear { .. }));
    }

    proptest! {
        #[test]
        fn chain_of_updates_resolves_from_every_member(updates in 0usize..8) {
            let l = ledger();
            let alice = AgentKey::generate();
            let mut ids = vec![l.create_chain(&note("v0"), &alice).unwrap()];
            for i in 1..=updates {
                let previous = *ids.last().unwrap();
                ids.push(l.update(&previous, &note(&format!("v{i}")), &alice).unwrap());
            }

            let all = l.get_all_revisions(&ids[0]).unwrap();
            prop_assert_eq!(all.len(), updates + 1);
            let order: Vec<ActionId> = all.iter().map(|r| r.action_id).collect();
            prop_assert_eq!(&order, &ids);
            for id in &ids {
                prop_assert_eq!(l.get_latest(id).unwrap().action_id, *ids.last().unwrap());
                prop_assert_eq!(l.get_original(id).unwrap().action_id, ids[0]);
            }
            prop_assert_eq!(l.verify_source_chain(&alice.agent_id()).unwrap(), updates + 1);
        }
    }
}
