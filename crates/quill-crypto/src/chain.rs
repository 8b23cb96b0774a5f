use crate::hasher::DomainHasher;

/// One link of an author's source chain.
///
/// Implemented by signed actions: each action names its position (`seq`),
/// its predecessor, and the canonical bytes its id was computed from.
pub trait ChainLink {
    /// The link's own hash.
    fn link_id(&self) -> [u8; 32];
    /// Hash of the author's previous link (None for the first).
    fn prev_link(&self) -> Option<[u8; 32]>;
    /// Zero-based position in the author's chain.
    fn seq(&self) -> u64;
    /// Canonical payload bytes the link id commits to.
    fn payload_bytes(&self) -> Vec<u8>;
}

/// Source-chain integrity verifier.
///
/// A valid chain starts at seq 0 with no predecessor, every later link
/// points at the link before it, seqs are contiguous, and every link id
/// recomputes from its payload and predecessor.
pub struct SourceChainVerifier;

impl SourceChainVerifier {
    /// Verify links already sorted by `seq`. Returns the chain length.
    pub fn verify(links: &[impl ChainLink]) -> Result<usize, ChainError> {
        let mut expected_prev: Option<[u8; 32]> = None;

        for (index, link) in links.iter().enumerate() {
            if link.seq() != index as u64 {
                return Err(ChainError::SeqGap {
                    expected: index as u64,
                    found: link.seq(),
                });
            }

            match (expected_prev, link.prev_link()) {
                (None, Some(_)) => return Err(ChainError::GenesisHasPrev),
                (Some(_), None) => return Err(ChainError::MissingPrev { seq: link.seq() }),
                (Some(want), Some(got)) if want != got => {
                    return Err(ChainError::BrokenLink { seq: link.seq() })
                }
                _ => {}
            }

            let computed = Self::compute_link(&link.payload_bytes(), link.prev_link());
            if computed != link.link_id() {
                return Err(ChainError::HashMismatch { seq: link.seq() });
            }

            expected_prev = Some(link.link_id());
        }

        Ok(links.len())
    }

    /// Link hash for a payload and optional predecessor. A leading tag byte
    /// marks whether a predecessor is present.
    pub fn compute_link(payload: &[u8], prev: Option<[u8; 32]>) -> [u8; 32] {
        match prev {
            Some(prev) => DomainHasher::ACTION.digest(&[&[1u8], &prev, payload]),
            None => DomainHasher::ACTION.digest(&[&[0u8], payload]),
        }
    }
}

/// Errors from source-chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("first link has a predecessor")]
    GenesisHasPrev,

    #[error("seq gap: expected {expected}, found {found}")]
    SeqGap { expected: u64, found: u64 },

    #[error("link at seq {seq} is missing its predecessor")]
    MissingPrev { seq: u64 },

    #[error("link at seq {seq} points at the wrong predecessor")]
    BrokenLink { seq: u64 },

    #[error("link at seq {seq} does not hash to its id")]
    HashMismatch { seq: u64 },
}
