//! Sampled history snapshots of a git repository.
//!
//! A handful of commits spread across the whole history are checked out one
//! after another in the repository's own working tree. For each one the code
//! files recorded in that commit's tree are read from disk and every file is
//! attributed to the authors who touched it up to that commit. The result is one JSON document per
//! repository.

pub mod account;
pub mod assemble;
pub mod attribution;
pub mod cli;
pub mod error;
pub mod export;
pub mod git;
pub mod history;
pub mod model;
pub mod persist;
pub mod remote;
pub mod sample;
pub mod util;

pub use error::{HistsnapError, Result};
pub use history::{export_repository, HistoryExporter, HistoryOptions};
pub use model::{AuthorIndex, CommitRef, FileRecord, Snapshot, SnapshotHistory};
