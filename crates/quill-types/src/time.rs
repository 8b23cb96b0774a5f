use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Hybrid logical timestamp attached to every action.
///
/// Ordering: `physical_ms` → `logical` → `node_id` (total order). Two
/// replicas can stamp concurrent writes without coordination and still agree
/// on which one is "older".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Wall-clock milliseconds since UNIX epoch.
    pub physical_ms: u64,
    /// Counter for events inside the same millisecond.
    pub logical: u32,
    /// Tie-breaker between replicas.
    pub node_id: u16,
}

impl Timestamp {
    pub const fn new(physical_ms: u64, logical: u32, node_id: u16) -> Self {
        Self {
            physical_ms,
            logical,
            node_id,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.physical_ms
            .cmp(&other.physical_ms)
            .then(self.logical.cmp(&other.logical))
            .then(self.node_id.cmp(&other.node_id))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timestamp({}ms.{}.n{})",
            self.physical_ms, self.logical, self.node_id
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.n{}", self.physical_ms, self.logical, self.node_id)
    }
}

struct ClockState {
    physical_ms: u64,
    logical: u32,
}

/// Per-replica hybrid logical clock.
///
/// `now()` is strictly monotonic for a given clock. `observe()` folds in a
/// timestamp received from another replica so that anything stamped locally
/// afterwards sorts after it.
pub struct HybridClock {
    node_id: u16,
    state: Mutex<ClockState>,
}

impl HybridClock {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            state: Mutex::new(ClockState {
                physical_ms: 0,
                logical: 0,
            }),
        }
    }

    /// Stamp a local event.
    pub fn now(&self) -> Timestamp {
        let wall = wall_clock_ms();
        let mut state = self.state.lock().expect("clock mutex poisoned");

        if wall > state.physical_ms {
            state.physical_ms = wall;
            state.logical = 0;
        } else {
            state.logical = state.logical.saturating_add(1);
        }

        Timestamp::new(state.physical_ms, state.logical, self.node_id)
    }

    /// Advance past a timestamp seen on a remote action.
    pub fn observe(&self, received: &Timestamp) {
        let mut state = self.state.lock().expect("clock mutex poisoned");
        if received.physical_ms > state.physical_ms {
            state.physical_ms = received.physical_ms;
            state.logical = received.logical;
        } else if received.physical_ms == state.physical_ms {
            state.logical = state.logical.max(received.logical);
        }
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}

impl fmt::Debug for HybridClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridClock")
            .field("node_id", &self.node_id)
            .finish()
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
