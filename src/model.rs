use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".ipynb", ".py", ".js", ".ts", ".java", ".cpp", ".c", ".go", ".rs", ".php", ".rb", ".kt",
    ".swift",
];

/// One commit of the oldest-first timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    #[serde(rename = "commit")]
    pub id: String,
    pub author: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file: String,
    pub content: String,
    pub authors: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub commit: CommitRef,
    pub files: Vec<FileRecord>,
}

pub type SnapshotHistory = Vec<Snapshot>;

/// Commits chosen by the sampler. `degraded` is set when the timeline held
/// fewer commits than were requested and every commit was taken.
#[derive(Debug, Clone)]
pub struct Sample {
    pub commits: Vec<CommitRef>,
    pub degraded: bool,
}

/// Path → authors who touched it, accumulated over a timeline prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl AuthorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &str, author: &str) {
        self.entries
            .entry(path.to_string())
            .or_default()
            .insert(author.to_string());
    }

    /// Authors of `path`, empty when the path was never touched.
    pub fn authors_of(&self, path: &str) -> BTreeSet<String> {
        self.entries.get(path).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
