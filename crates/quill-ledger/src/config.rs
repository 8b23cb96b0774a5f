use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Runtime knobs for a [`Ledger`](crate::Ledger).
///
/// Loaded from TOML; every field has a default, so an empty document is a
/// valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Node id stamped into every timestamp this replica produces.
    pub node_id: u16,
    /// Lock shards per index. Writes to keys in different shards never contend.
    pub shard_count: usize,
    /// Reject local updates whose `previous` already has a successor.
    pub reject_stale_updates: bool,
    /// Only the original author of a chain or link may update or delete it.
    pub enforce_original_author: bool,
    /// Re-hash and signature-check actions received from other replicas.
    pub verify_integrated_actions: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            shard_count: 16,
            reject_stale_updates: true,
            enforce_original_author: false,
            verify_integrated_actions: true,
        }
    }
}

impl LedgerConfig {
    pub fn with_node_id(mut self, node_id: u16) -> Self {
        self.node_id = node_id;
        self
    }

    pub fn from_toml_str(text: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> LedgerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.shard_count == 0 || self.shard_count > 256 {
            return Err(LedgerError::Config(format!(
                "shard_count must be in 1..=256, got {}",
                self.shard_count
            )));
        }
        Ok(())
    }
}
