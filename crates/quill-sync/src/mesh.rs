use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use quill_ledger::{ActionRecord, Ledger};

use crate::barrier::SyncBarrier;
use crate::error::{SyncError, SyncResult};
use crate::types::{MeshConfig, PeerId, SyncReport};

struct Peer {
    name: String,
    ledger: Arc<Ledger>,
    online: bool,
}

#[derive(Default)]
struct MeshState {
    /// (source, target) → journal cursor on the source.
    cursors: HashMap<(PeerId, PeerId), usize>,
    /// Records a target could not integrate yet.
    pending: HashMap<PeerId, Vec<ActionRecord>>,
}

/// Full-mesh replication between in-process ledgers.
///
/// Each `converge` pulls every online peer's journal into every other
/// online peer, retrying records whose dependencies are missing, until a
/// round moves nothing. Offline peers keep their cursors and catch up once
/// they come back.
pub struct LocalMesh {
    config: MeshConfig,
    peers: RwLock<Vec<Peer>>,
    state: Mutex<MeshState>,
}

impl LocalMesh {
    pub fn new(config: MeshConfig) -> Self {
        Self {
            config,
            peers: RwLock::new(Vec::new()),
            state: Mutex::new(MeshState::default()),
        }
    }

    pub fn add_peer(&self, name: impl Into<String>, ledger: Arc<Ledger>) -> PeerId {
        let mut peers = self.peers.write().expect("lock poisoned");
        let id = PeerId(peers.len());
        let name = name.into();
        debug!(peer = %id, name = %name, "peer joined mesh");
        peers.push(Peer {
            name,
            ledger,
            online: true,
        });
        id
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().expect("lock poisoned").len()
    }

    pub fn ledger(&self, peer: PeerId) -> SyncResult<Arc<Ledger>> {
        let peers = self.peers.read().expect("lock poisoned");
        peers
            .get(peer.0)
            .map(|p| Arc::clone(&p.ledger))
            .ok_or(SyncError::UnknownPeer(peer))
    }

    /// Take a peer on or off the network.
    pub fn set_online(&self, peer: PeerId, online: bool) -> SyncResult<()> {
        let mut peers = self.peers.write().expect("lock poisoned");
        let p = peers.get_mut(peer.0).ok_or(SyncError::UnknownPeer(peer))?;
        p.online = online;
        debug!(peer = %peer, name = %p.name, online, "peer availability changed");
        Ok(())
    }

    pub fn is_online(&self, peer: PeerId) -> SyncResult<bool> {
        let peers = self.peers.read().expect("lock poisoned");
        peers
            .get(peer.0)
            .map(|p| p.online)
            .ok_or(SyncError::UnknownPeer(peer))
    }

    fn online_peers(&self) -> Vec<(PeerId, Arc<Ledger>)> {
        let peers = self.peers.read().expect("lock poisoned");
        peers
            .iter()
            .enumerate()
            .filter(|(_, p)| p.online)
            .map(|(i, p)| (PeerId(i), Arc::clone(&p.ledger)))
            .collect()
    }
}

/// Pull new journal records from every source into every target's queue.
/// Returns how many were pulled.
fn pull(state: &mut MeshState, peers: &[(PeerId, Arc<Ledger>)]) -> usize {
    let mut pulled = 0;
    for (source, source_ledger) in peers {
        for (target, _) in peers {
            if source == target {
                continue;
            }
            let cursor = state.cursors.entry((*source, *target)).or_insert(0);
            let (records, next) = source_ledger.records_since(*cursor);
            *cursor = next;
            pulled += records.len();
            state.pending.entry(*target).or_default().extend(records);
        }
    }
    pulled
}

#[derive(Default)]
struct RoundOutcome {
    integrated: usize,
    rejected: usize,
}

/// Drain each target's queue, keeping only records that must wait.
fn integrate_pending(state: &mut MeshState, peers: &[(PeerId, Arc<Ledger>)]) -> RoundOutcome {
    let mut outcome = RoundOutcome::default();
    for (target, ledger) in peers {
        let Some(queue) = state.pending.get_mut(target) else {
            continue;
        };
        let mut waiting = Vec::new();
        for record in queue.drain(..) {
            match ledger.integrate(record.clone()) {
                Ok(true) => outcome.integrated += 1,
                Ok(false) => {}
                Err(err) if err.is_transient() => waiting.push(record),
                Err(err) => {
                    warn!(
                        peer = %target,
                        id = %record.id().short_hex(),
                        error = %err,
                        "peer rejected record"
                    );
                    outcome.rejected += 1;
                }
            }
        }
        *queue = waiting;
    }
    outcome
}

#[async_trait]
impl SyncBarrier for LocalMesh {
    async fn converge(&self) -> SyncResult<SyncReport> {
        let mut state = self.state.lock().await;
        let peers = self.online_peers();
        let mut report = SyncReport::default();

        loop {
            if report.rounds == self.config.max_rounds {
                let pending = pending_for(&state, &peers);
                return Err(SyncError::Stalled {
                    rounds: report.rounds,
                    pending,
                });
            }
            report.rounds += 1;

            let pulled = pull(&mut state, &peers);
            let outcome = integrate_pending(&mut state, &peers);
            report.transferred += outcome.integrated;
            report.rejected += outcome.rejected;
            debug!(
                round = report.rounds,
                pulled,
                integrated = outcome.integrated,
                "sync round finished"
            );

            if pulled == 0 && outcome.integrated == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        report.deferred = pending_for(&state, &peers);
        info!(
            rounds = report.rounds,
            transferred = report.transferred,
            deferred = report.deferred,
            rejected = report.rejected,
            "replicas converged"
        );
        Ok(report)
    }
}

fn pending_for(state: &MeshState, peers: &[(PeerId, Arc<Ledger>)]) -> usize {
    peers
        .iter()
        .filter_map(|(id, _)| state.pending.get(id))
        .map(Vec::len)
        .sum()
}
