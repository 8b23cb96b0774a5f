//! Content-addressed entry storage for quill.
//!
//! Entries are application payloads (a blog post, a comment) reduced to a
//! self-describing [`EntryDocument`]: an entry type name plus a sorted map of
//! field name to tagged value. Documents are framed and encoded with
//! [`codec`], and the encoded bytes are stored under their BLAKE3
//! [`ContentHash`](quill_types::ContentHash).
//!
//! # Design Rules
//!
//! 1. Stored bytes are immutable; the address is derived from them.
//! 2. `put` is idempotent: identical logical content encodes to identical
//!    bytes and therefore the same address.
//! 3. `get` on an absent address is `NotFound`, which under replication may
//!    mean "not arrived yet" rather than "never existed".
//! 4. Reads re-hash and reject corrupted bytes.

pub mod codec;
pub mod error;
pub mod memory;
pub mod traits;

pub use codec::{AppEntry, EntryDocument, FieldMap, FieldValue, CODEC_VERSION, MAX_ENTRY_SIZE};
pub use error::{CodecError, CodecResult, StoreError, StoreResult};
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
