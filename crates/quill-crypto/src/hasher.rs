use quill_types::ContentHash;

/// Domain-separated BLAKE3 hasher.
///
/// The domain tag is prepended to every computation, so entry bytes and
/// action bytes that happen to be identical still hash differently.
pub struct DomainHasher {
    domain: &'static str,
}

impl DomainHasher {
    /// Hasher for encoded entry content.
    pub const ENTRY: Self = Self {
        domain: "quill-entry-v1",
    };
    /// Hasher for signed actions (the source-chain link hash).
    pub const ACTION: Self = Self {
        domain: "quill-action-v1",
    };

    /// Hash `parts` in order under this domain.
    pub fn digest(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Content address for encoded entry bytes.
    pub fn content_hash(data: &[u8]) -> ContentHash {
        ContentHash::from_raw(Self::ENTRY.digest(&[data]))
    }

    /// Check encoded entry bytes against an expected address.
    pub fn verify_content(data: &[u8], expected: &ContentHash) -> bool {
        Self::content_hash(data) == *expected
    }
}
