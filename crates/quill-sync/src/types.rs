use serde::{Deserialize, Serialize};

/// Index of a peer within a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub usize);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Outcome of one convergence pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Exchange rounds run before reaching a fixpoint.
    pub rounds: usize,
    /// Records newly integrated across all peers.
    pub transferred: usize,
    /// Records still waiting on a dependency (e.g. held by an offline peer).
    pub deferred: usize,
    /// Records a peer refused outright (bad signature, failed validation).
    pub rejected: usize,
}

impl SyncReport {
    /// `true` if every reachable record landed everywhere it could.
    pub fn is_complete(&self) -> bool {
        self.deferred == 0 && self.rejected == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Upper bound on exchange rounds per `converge` call.
    pub max_rounds: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self { max_rounds: 64 }
    }
}
