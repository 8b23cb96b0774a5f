use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::{ActionId, ContentHash};

/// A reference to an entry, either by the hash of its content or by the
/// action that wrote it.
///
/// Content references name *what* was written and may match several chains
/// that happen to hold identical bytes. Action references name one specific
/// write and therefore exactly one chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryRef {
    Content(ContentHash),
    Action(ActionId),
}

impl EntryRef {
    pub fn as_action(&self) -> Option<&ActionId> {
        match self {
            Self::Action(id) => Some(id),
            Self::Content(_) => None,
        }
    }

    pub fn as_content(&self) -> Option<&ContentHash> {
        match self {
            Self::Content(hash) => Some(hash),
            Self::Action(_) => None,
        }
    }

    /// First byte of the underlying digest; used for shard selection.
    pub fn first_byte(&self) -> u8 {
        match self {
            Self::Content(hash) => hash.as_bytes()[0],
            Self::Action(id) => id.as_bytes()[0],
        }
    }
}

impl From<ContentHash> for EntryRef {
    fn from(hash: ContentHash) -> Self {
        Self::Content(hash)
    }
}

impl From<ActionId> for EntryRef {
    fn from(id: ActionId) -> Self {
        Self::Action(id)
    }
}

impl fmt::Debug for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(hash) => write!(f, "EntryRef::Content({})", hash.short_hex()),
            Self::Action(id) => write!(f, "EntryRef::Action({})", id.short_hex()),
        }
    }
}

/// `content:<hex>` or `action:<hex>`.
impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(hash) => write!(f, "content:{hash}"),
            Self::Action(id) => write!(f, "action:{id}"),
        }
    }
}

impl FromStr for EntryRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("content:") {
            return ContentHash::from_hex(rest).map(Self::Content);
        }
        if let Some(rest) = s.strip_prefix("action:") {
            return ActionId::from_hex(rest).map(Self::Action);
        }
        let prefix = s.split(':').next().unwrap_or_default();
        Err(TypeError::UnknownRefPrefix(prefix.to_string()))
    }
}
