//! Foundation types for quill.
//!
//! Every other quill crate depends on `quill-types`. The identifiers here are
//! all fixed-size BLAKE3 or Ed25519 byte strings; none of them carry meaning
//! beyond equality, ordering, and display.
//!
//! # Key Types
//!
//! - [`ContentHash`]: address of immutable entry bytes
//! - [`ActionId`]: identity of a single signed write (create, update, delete, link)
//! - [`AgentId`]: an author's Ed25519 public key
//! - [`EntryRef`]: a reference to an entry either by content or by action
//! - [`Timestamp`] / [`HybridClock`]: hybrid logical time for ordering writes

pub mod agent;
pub mod entry_ref;
pub mod error;
pub mod hash;
pub mod time;

pub use agent::AgentId;
pub use entry_ref::EntryRef;
pub use error::TypeError;
pub use hash::{ActionId, ContentHash};
pub use time::{HybridClock, Timestamp};
