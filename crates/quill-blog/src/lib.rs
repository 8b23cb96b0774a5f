//! A small blog on the quill ledger.
//!
//! Posts and comments are versioned entries; each comment is linked from
//! its post with a [`LinkTypes::PostToComments`] link. Deleting a comment
//! tombstones both the comment and its links, so history stays readable
//! while the live view drops it.

pub mod cell;
pub mod entries;
pub mod error;

#[cfg(test)]
mod scenarios;

pub use cell::{BlogCell, UpdateCommentInput, UpdatePostInput};
pub use entries::{Comment, LinkTypes, Post};
pub use error::{BlogError, BlogResult};
