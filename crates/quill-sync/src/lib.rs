//! Replica convergence for quill ledgers.
//!
//! Ledgers never wait for each other. Code that needs one agent's writes
//! to be visible to another awaits a [`SyncBarrier`] in between:
//!
//! - [`LocalMesh`] replicates journals between in-process ledgers until
//!   nothing moves, with peers that can be taken offline to model delay.
//! - [`SyncService`] runs any barrier on its own task; its [`SyncHandle`]
//!   is itself a barrier, so callers stay agnostic of where sync runs.

pub mod barrier;
pub mod error;
pub mod mesh;
pub mod service;
pub mod types;

pub use barrier::SyncBarrier;
pub use error::{SyncError, SyncResult};
pub use mesh::LocalMesh;
pub use service::{SyncHandle, SyncService};
pub use types::{MeshConfig, PeerId, SyncReport};
