//! tinygit core library.
//!
//! A local version-control engine:
//! - Content-addressable object model (blobs, commits, SHA-256 digests)
//! - Staging area and commit transition logic
//! - Commit graph traversal and first-parent LCA discovery
//! - Three-way merge engine with conflict marking
//! - Push/fetch/pull between repository roots on the filesystem
//!
//! All state lives under a `.tinygit` marker directory; the [`Repository`]
//! handle is the entry point for every operation. Execution is
//! single-threaded and synchronous, with exactly one process per
//! repository root at a time.

pub mod error;
pub mod graph;
pub mod merge;
pub mod object;
pub mod refs;
pub mod remote;
pub mod repo;
pub mod stage;
pub mod store;

pub use error::{Error, Result};
pub use merge::MergeOutcome;
pub use object::{Blob, Commit, Digest, FORMAT_VERSION};
pub use refs::{Branch, RefStore};
pub use remote::Remote;
pub use repo::{DEFAULT_BRANCH, REPO_DIR, Repository, Status};
pub use stage::{Stage, StagedAddition};
pub use store::ObjectStore;
