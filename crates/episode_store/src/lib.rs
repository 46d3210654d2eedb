//! # Episode Store
//!
//! Persistence for the episode pipeline: the named text artifacts produced by
//! each generation cycle, the ledger of already processed transcripts, and the
//! resumable publish-watch record.
//!
//! Everything lives on the local filesystem. The storage traits keep the
//! pipeline independent of that choice so tests can swap in memory-backed
//! implementations.

mod datastore;
mod domain;

pub use datastore::fs::{FileWatchStateStore, FsArtifactStore};
pub use datastore::{ArtifactStore, WatchStateStore};
pub use domain::{Artifact, ArtifactBundle, PublishPayload, WatchState};
