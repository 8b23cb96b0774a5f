//! The quill ledger: versioned entries, tombstones, and links.
//!
//! Every write is a [`SignedAction`] that extends its author's source
//! chain. A [`Ledger`] applies actions to three independently locked
//! indexes:
//!
//! - **Revision chains** ([`RevisionChains`]): each entry's history, rooted
//!   at its create action and extended by updates that name their previous
//!   revision. Concurrent updates fork the chain; forks are reported, never
//!   silently resolved.
//! - **Tombstones** ([`TombstoneIndex`]): deletions of revisions or links.
//!   Data is never removed; a target with at least one tombstone is dead.
//! - **Links** ([`LinkIndex`]): typed, tagged edges from a base entry to a
//!   target action.
//!
//! Applied actions are journaled in order so replicas can pull them by
//! cursor and [`Ledger::integrate`] them.

pub mod action;
pub mod config;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod links;
pub mod records;
pub mod revisions;
mod shard;
pub mod tombstones;

pub use action::{Action, ActionHeader, ActionRecord, SignedAction};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult, Missing};
pub use journal::Journal;
pub use ledger::Ledger;
pub use links::LinkIndex;
pub use records::{ChainStatus, LinkEdge, LinkFilter, Revision, Tombstone};
pub use revisions::{RevisionChains, RevisionNode};
pub use tombstones::TombstoneIndex;
