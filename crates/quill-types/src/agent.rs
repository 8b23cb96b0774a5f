use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{parse_32, TypeError};

/// An author's identity: the raw bytes of their Ed25519 public key.
///
/// Every action is signed by the key behind its `AgentId`, so the id doubles
/// as the verification key for that author's writes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId([u8; 32]);

impl AgentId {
    /// Wrap raw public key bytes.
    pub const fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// A random agent id that is not backed by any signing key.
    ///
    /// Useful as sample data (e.g. the `author` field of an entry) in tests
    /// and demos; actions can never verify against it.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// The raw 32 key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short identifier: `agent:` followed by the first 8 hex characters.
    pub fn short_id(&self) -> String {
        format!("agent:{}", hex::encode(&self.0[..4]))
    }

    /// Parse from hex, with or without the `agent:` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("agent:").unwrap_or(s);
        parse_32(s).map(Self)
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.short_id())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}
