use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HistsnapError>;

#[derive(Error, Debug)]
pub enum HistsnapError {
    #[error("Failed to acquire repository {source_url}: {reason}")]
    AcquisitionFailed { source_url: String, reason: String },
    #[error("No commit history available: {0}")]
    HistoryUnavailable(String),
    #[error("Checkout of commit {commit} failed: {reason}")]
    CheckoutFailed { commit: String, reason: String },
    #[error("Could not restore a primary branch: {0}")]
    RestoreFailed(String),
    #[error("Failed to read {path}: {reason}")]
    FileReadFailed { path: PathBuf, reason: String },
    #[error("Remote listing failed with status {status}: {body}")]
    RemoteListing { status: u16, body: String },
    #[error("Invalid repository source: {0}")]
    InvalidSource(String),
    #[error("Sample count must be at least 1, got {0}")]
    InvalidSampleCount(usize),
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
    #[error("Git error: {0}")]
    Git(#[from] Box<gix::open::Error>),
    #[error("Tree traversal error: {0}")]
    TreeTraverse(#[from] Box<gix::traverse::tree::breadthfirst::Error>),
}

// Manual From implementations for unboxed to boxed conversions
impl From<ureq::Error> for HistsnapError {
    fn from(err: ureq::Error) -> Self {
        HistsnapError::Http(Box::new(err))
    }
}

impl From<gix::object::find::existing::Error> for HistsnapError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        HistsnapError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for HistsnapError {
    fn from(err: gix::object::commit::Error) -> Self {
        HistsnapError::Commit(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for HistsnapError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        HistsnapError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for HistsnapError {
    fn from(err: gix::objs::decode::Error) -> Self {
        HistsnapError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for HistsnapError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        HistsnapError::DiffTreeToTree(Box::new(err))
    }
}

impl From<gix::open::Error> for HistsnapError {
    fn from(err: gix::open::Error) -> Self {
        HistsnapError::Git(Box::new(err))
    }
}

impl From<gix::traverse::tree::breadthfirst::Error> for HistsnapError {
    fn from(err: gix::traverse::tree::breadthfirst::Error) -> Self {
        HistsnapError::TreeTraverse(Box::new(err))
    }
}
