//! Cryptographic primitives for quill.
//!
//! Provides domain-separated BLAKE3 hashing for entry content and actions,
//! Ed25519 agent keys that sign every action, and verification of an
//! author's hash-linked source chain.
//!
//! All crypto operations wrap established libraries; nothing here is custom
//! cryptography.

pub mod chain;
pub mod hasher;
pub mod signer;

pub use chain::{ChainError, ChainLink, SourceChainVerifier};
pub use hasher::DomainHasher;
pub use signer::{AgentKey, Signature, SignatureError};
