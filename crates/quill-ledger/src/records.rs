use serde::{Deserialize, Serialize};

use quill_store::{AppEntry, CodecResult, EntryDocument};
use quill_types::{ActionId, AgentId, ContentHash, EntryRef, Timestamp};

/// One version of an entry within a revision chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub action_id: ActionId,
    /// Root of the chain this revision belongs to.
    pub original: ActionId,
    /// `None` only for the original.
    pub previous: Option<ActionId>,
    pub author: AgentId,
    pub timestamp: Timestamp,
    pub entry_hash: ContentHash,
    pub entry: EntryDocument,
}

impl Revision {
    pub fn is_original(&self) -> bool {
        self.previous.is_none()
    }

    /// Decode the entry as a typed application entry.
    pub fn entry_as<E: AppEntry>(&self) -> CodecResult<E> {
        self.entry.to_entry()
    }
}

/// A record that its target was deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub action_id: ActionId,
    pub target: ActionId,
    pub author: AgentId,
    pub timestamp: Timestamp,
}

/// A typed, tagged edge from a base to a target action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEdge {
    pub action_id: ActionId,
    pub base: EntryRef,
    pub target: ActionId,
    pub link_type: String,
    pub tag: String,
    pub author: AgentId,
    pub timestamp: Timestamp,
}

/// Shape of a revision chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStatus {
    /// A single head.
    Linear { latest: ActionId },
    /// Concurrent updates split the chain. Heads are in timestamp order.
    Forked { heads: Vec<ActionId> },
}

/// Which edges a link query returns. The default matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFilter {
    pub link_type: Option<String>,
    /// Tags must start with this prefix.
    pub tag_prefix: Option<String>,
}

impl LinkFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of_type(link_type: impl Into<String>) -> Self {
        Self {
            link_type: Some(link_type.into()),
            tag_prefix: None,
        }
    }

    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, edge: &LinkEdge) -> bool {
        self.link_type
            .as_deref()
            .map_or(true, |t| edge.link_type == t)
            && self
                .tag_prefix
                .as_deref()
                .map_or(true, |p| edge.tag.starts_with(p))
    }
}
