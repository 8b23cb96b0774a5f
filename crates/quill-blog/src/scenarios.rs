//! Two agents on two replicas, synchronised through a sync service.

use std::sync::Arc;

use tokio::task::JoinHandle;

use quill_crypto::AgentKey;
use quill_ledger::{ChainStatus, Ledger, LedgerConfig, LedgerError};
use quill_sync::{LocalMesh, MeshConfig, PeerId, SyncHandle, SyncService};
use quill_types::{AgentId, EntryRef};

use crate::cell::{BlogCell, UpdateCommentInput};
use crate::entries::{Comment, Post};
use crate::error::BlogError;

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.";

struct Scenario {
    alice: BlogCell,
    bob: BlogCell,
    mesh: Arc<LocalMesh>,
    sync: SyncHandle,
    _service: JoinHandle<()>,
}

impl Scenario {
    async fn dht_sync(&self) {
        let report = self.sync.dht_sync().await.unwrap();
        assert!(report.is_complete(), "sync left work behind: {report:?}");
    }
}

fn scenario() -> Scenario {
    let mesh = Arc::new(LocalMesh::new(MeshConfig::default()));
    let mut cells = ["alice", "bob"].into_iter().enumerate().map(|(i, name)| {
        let ledger = Arc::new(Ledger::in_memory(
            LedgerConfig::default().with_node_id(i as u16 + 1),
        ));
        mesh.add_peer(name, Arc::clone(&ledger));
        BlogCell::new(AgentKey::generate(), ledger)
    });
    let alice = cells.next().unwrap();
    let bob = cells.next().unwrap();
    drop(cells);
    let (sync, service) = SyncService::spawn(mesh.clone(), 8);
    Scenario {
        alice,
        bob,
        mesh,
        sync,
        _service: service,
    }
}

fn sample_post() -> Post {
    Post {
        name: LOREM.into(),
        content: LOREM.into(),
        author: AgentId::ephemeral(),
    }
}

fn sample_comment(cell: &BlogCell) -> Comment {
    Comment {
        content: LOREM.into(),
        post_ref: EntryRef::Action(cell.create_post(sample_post()).unwrap()),
        author: AgentId::ephemeral(),
    }
}

#[tokio::test]
async fn create_comment() {
    let s = scenario();
    let comment = sample_comment(&s.alice);
    let id = s.alice.create_comment(comment).unwrap();
    assert!(s.alice.get_original_comment(&id).unwrap().is_some());
}

#[tokio::test]
async fn create_and_read_comment() {
    let s = scenario();
    let sample = sample_comment(&s.alice);
    let record = s.alice.create_comment(sample.clone()).unwrap();

    s.dht_sync().await;

    let read = s.bob.get_original_comment(&record).unwrap().unwrap();
    assert_eq!(read.entry_as::<Comment>().unwrap(), sample);

    let links = s.bob.get_comments_for_post(&sample.post_ref).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target, record);
}

#[tokio::test]
async fn create_and_update_comment() {
    let s = scenario();
    let original = s.alice.create_comment(sample_comment(&s.alice)).unwrap();

    let mut content_update = sample_comment(&s.alice);
    let mut updated = s
        .alice
        .update_comment(UpdateCommentInput {
            previous_comment_hash: original,
            updated_comment: content_update.clone(),
        })
        .unwrap();

    s.dht_sync().await;

    let latest = s.bob.get_latest_comment(&updated).unwrap();
    assert_eq!(latest.entry_as::<Comment>().unwrap(), content_update);

    content_update = sample_comment(&s.alice);
    updated = s
        .alice
        .update_comment(UpdateCommentInput {
            previous_comment_hash: updated,
            updated_comment: content_update.clone(),
        })
        .unwrap();

    s.dht_sync().await;

    let latest = s.bob.get_latest_comment(&updated).unwrap();
    assert_eq!(latest.entry_as::<Comment>().unwrap(), content_update);

    let revisions = s.bob.get_all_revisions_for_comment(&original).unwrap();
    assert_eq!(revisions.len(), 3);
    assert_eq!(revisions[2].entry_as::<Comment>().unwrap(), content_update);
    // Reading from the original walks to the same end.
    assert_eq!(s.bob.get_latest_comment(&original).unwrap().action_id, updated);
}

#[tokio::test]
async fn create_and_delete_comment() {
    let s = scenario();
    let sample = sample_comment(&s.alice);
    let record = s.alice.create_comment(sample.clone()).unwrap();

    s.dht_sync().await;

    let links = s.bob.get_comments_for_post(&sample.post_ref).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target, record);

    s.alice.delete_comment(&record).unwrap();

    s.dht_sync().await;

    s.bob.get_oldest_delete_for_comment(&record).unwrap();
    assert_eq!(s.bob.get_all_deletes_for_comment(&record).unwrap().len(), 1);
    assert!(s.bob.get_comments_for_post(&sample.post_ref).unwrap().is_empty());
    let deleted = s.bob.get_deleted_comments_for_post(&sample.post_ref).unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].1.len(), 1);
}

#[tokio::test]
async fn reads_before_sync_are_transiently_missing() {
    let s = scenario();
    let sample = sample_comment(&s.alice);
    let record = s.alice.create_comment(sample.clone()).unwrap();

    assert!(s.bob.get_original_comment(&record).unwrap().is_none());
    let err = s.bob.get_latest_comment(&record).unwrap_err();
    assert!(err.is_not_found());
    assert!(s.bob.get_comments_for_post(&sample.post_ref).unwrap().is_empty());

    s.dht_sync().await;
    assert!(s.bob.get_original_comment(&record).unwrap().is_some());
}

#[tokio::test]
async fn offline_replica_sees_writes_once_reconnected() {
    let s = scenario();
    s.mesh.set_online(PeerId(1), false).unwrap();
    let sample = sample_comment(&s.alice);
    let record = s.alice.create_comment(sample).unwrap();

    s.dht_sync().await;
    assert!(s.bob.get_original_comment(&record).unwrap().is_none());

    s.mesh.set_online(PeerId(1), true).unwrap();
    s.dht_sync().await;
    assert!(s.bob.get_original_comment(&record).unwrap().is_some());
}

#[tokio::test]
async fn concurrent_updates_surface_as_conflict() {
    let s = scenario();
    let sample = sample_comment(&s.alice);
    let original = s.alice.create_comment(sample.clone()).unwrap();
    s.dht_sync().await;

    let edit = |content: &str| UpdateCommentInput {
        previous_comment_hash: original,
        updated_comment: Comment {
            content: content.into(),
            ..sample.clone()
        },
    };
    let from_alice = s.alice.update_comment(edit("from alice")).unwrap();
    let from_bob = s.bob.update_comment(edit("from bob")).unwrap();
    s.dht_sync().await;

    for cell in [&s.alice, &s.bob] {
        for start in [original, from_alice, from_bob] {
            let err = cell.get_latest_comment(&start).unwrap_err();
            assert!(matches!(
                err,
                BlogError::Ledger(LedgerError::Conflict { ref heads }) if heads.len() == 2
            ));
        }
        assert_eq!(cell.get_all_revisions_for_comment(&original).unwrap().len(), 3);
    }
    assert_eq!(
        s.alice.ledger().chain_status(&original).unwrap(),
        s.bob.ledger().chain_status(&original).unwrap()
    );
    assert!(matches!(
        s.bob.ledger().chain_status(&original).unwrap(),
        ChainStatus::Forked { .. }
    ));
}

#[tokio::test]
async fn concurrent_deletes_are_all_kept() {
    let s = scenario();
    let sample = sample_comment(&s.alice);
    let record = s.alice.create_comment(sample.clone()).unwrap();
    s.dht_sync().await;

    s.alice.delete_comment(&record).unwrap();
    s.bob.delete_comment(&record).unwrap();
    s.dht_sync().await;

    for cell in [&s.alice, &s.bob] {
        let deletes = cell.get_all_deletes_for_comment(&record).unwrap();
        assert_eq!(deletes.len(), 2);
        assert_eq!(cell.get_oldest_delete_for_comment(&record).unwrap(), deletes[0]);
        assert!(cell.get_comments_for_post(&sample.post_ref).unwrap().is_empty());
        let deleted = cell.get_deleted_comments_for_post(&sample.post_ref).unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].1.len(), 2);
    }
}

#[tokio::test]
async fn replicas_agree_on_source_chains() {
    let s = scenario();
    let comment = sample_comment(&s.alice);
    let id = s.alice.create_comment(comment).unwrap();
    s.alice.delete_comment(&id).unwrap();
    s.dht_sync().await;

    let alice = s.alice.agent_id();
    let expected = s.alice.ledger().verify_source_chain(&alice).unwrap();
    assert_eq!(s.bob.ledger().verify_source_chain(&alice).unwrap(), expected);
    assert_eq!(expected, s.alice.ledger().journal_len());
}
