//! Signed actions: the unit of every write.
//!
//! An action's id is the BLAKE3 link hash of its canonical payload and the
//! author's previous action, so ids double as source-chain links. The
//! signature covers the id bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use quill_crypto::{AgentKey, ChainLink, Signature, SourceChainVerifier};
use quill_types::{ActionId, AgentId, ContentHash, EntryRef, Timestamp};

use crate::error::{LedgerError, LedgerResult};

/// What a write does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Start a revision chain.
    Create {
        entry_type: String,
        entry_hash: ContentHash,
    },
    /// Append a revision after `previous` in the chain rooted at `original`.
    Update {
        original: ActionId,
        previous: ActionId,
        entry_type: String,
        entry_hash: ContentHash,
    },
    /// Tombstone a revision or link.
    Delete { target: ActionId },
    CreateLink {
        base: EntryRef,
        target: ActionId,
        link_type: String,
        tag: String,
    },
    DeleteLink { link: ActionId },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::CreateLink { .. } => "create_link",
            Self::DeleteLink { .. } => "delete_link",
        }
    }

    /// Content the action writes, if any.
    pub fn entry_hash(&self) -> Option<&ContentHash> {
        match self {
            Self::Create { entry_hash, .. } | Self::Update { entry_hash, .. } => Some(entry_hash),
            _ => None,
        }
    }
}

/// Author-side metadata bound into the action id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHeader {
    pub author: AgentId,
    pub timestamp: Timestamp,
    /// Position in the author's source chain.
    pub seq: u64,
    /// The author's previous action.
    pub prev_action: Option<ActionId>,
}

/// An action with its id and the author's signature over that id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAction {
    pub id: ActionId,
    pub header: ActionHeader,
    pub action: Action,
    pub signature: Signature,
}

impl SignedAction {
    /// Hash and sign. The header's author must be the signing key.
    pub fn sign(key: &AgentKey, header: ActionHeader, action: Action) -> LedgerResult<Self> {
        if header.author != key.agent_id() {
            return Err(LedgerError::Validation(format!(
                "header author {} does not match signing key {}",
                header.author,
                key.agent_id()
            )));
        }
        let payload = canonical_payload(&header, &action)?;
        let id = ActionId::from_raw(SourceChainVerifier::compute_link(
            &payload,
            header.prev_action.map(|prev| *prev.as_bytes()),
        ));
        let signature = key.sign(id.as_bytes());
        Ok(Self {
            id,
            header,
            action,
            signature,
        })
    }

    /// Recompute the id and check the signature.
    pub fn verify(&self) -> LedgerResult<()> {
        let payload = canonical_payload(&self.header, &self.action)?;
        let computed = SourceChainVerifier::compute_link(&payload, self.prev_link());
        if computed != *self.id.as_bytes() {
            return Err(LedgerError::IntegrityViolation(format!(
                "action {} does not hash to its id",
                self.id.short_hex()
            )));
        }
        self.signature
            .verify(&self.header.author, self.id.as_bytes())
            .map_err(|e| {
                LedgerError::IntegrityViolation(format!("action {}: {e}", self.id.short_hex()))
            })
    }

    pub fn author(&self) -> &AgentId {
        &self.header.author
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.timestamp
    }
}

fn canonical_payload(header: &ActionHeader, action: &Action) -> LedgerResult<Vec<u8>> {
    bincode::serialize(&(&header.author, &header.timestamp, header.seq, action))
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

impl ChainLink for SignedAction {
    fn link_id(&self) -> [u8; 32] {
        *self.id.as_bytes()
    }

    fn prev_link(&self) -> Option<[u8; 32]> {
        self.header.prev_action.map(|prev| *prev.as_bytes())
    }

    fn seq(&self) -> u64 {
        self.header.seq
    }

    fn payload_bytes(&self) -> Vec<u8> {
        // An unencodable action can never match its id; verification reports it.
        canonical_payload(&self.header, &self.action).unwrap_or_default()
    }
}

/// A journaled action plus the entry bytes it wrote, as shipped to peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: SignedAction,
    pub entry: Option<Bytes>,
}

impl ActionRecord {
    pub fn id(&self) -> ActionId {
        self.action.id
    }
}
