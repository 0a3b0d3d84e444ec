use crate::assemble::TreeSource;
use crate::attribution::ChangeSource;
use crate::error::{HistsnapError, Result};
use crate::model::CommitRef;
use chrono::{DateTime, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Branch names tried, in order, when looking for the primary line of history.
pub const PRIMARY_BRANCHES: [&str; 2] = ["main", "master"];

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open the repository rooted at `path`, or current dir if `None`.
    ///
    /// Parent directories are not searched, so a plain directory nested in
    /// some other checkout is rejected rather than resolved to that checkout.
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = gix::open(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn primary_tip(&self) -> Result<ObjectId> {
        for name in PRIMARY_BRANCHES {
            let spec = format!("refs/heads/{name}");
            if let Ok(id) = self.repo.rev_parse_single(spec.as_str()) {
                debug!(branch = name, "resolved primary branch");
                return Ok(id.detach());
            }
        }

        // default branch under another name, e.g. develop
        if let Ok(Some(head)) = self.repo.head_name() {
            if let Ok(id) = self.repo.rev_parse_single(head.as_bstr()) {
                debug!(branch = %head.shorten(), "resolved checked-out branch");
                return Ok(id.detach());
            }
        }

        self.repo
            .rev_parse_single("HEAD")
            .map(|id| id.detach())
            .map_err(|e| {
                HistsnapError::HistoryUnavailable(format!(
                    "{} has no resolvable branch: {e}",
                    self.path.display()
                ))
            })
    }

    /// Every commit reachable from the primary branch, oldest first.
    pub fn load_timeline(&self) -> Result<Vec<CommitRef>> {
        let tip = self.primary_tip()?;

        let mut found: Vec<(String, String, DateTime<Utc>)> = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack: VecDeque<ObjectId> = VecDeque::from([tip]);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Loading commit timeline...");

        while let Some(commit_id) = stack.pop_back() {
            if !seen.insert(commit_id) {
                continue;
            }

            let commit = self.repo.find_commit(commit_id)?;
            let secs = commit.time()?.seconds;
            let timestamp = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| HistsnapError::InvalidDate(format!("Invalid timestamp: {secs}")))?;
            let author = commit.author()?.name.to_string();

            found.push((commit_id.to_string(), author, timestamp));

            for pid in commit.parent_ids() {
                stack.push_back(pid.into());
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if found.is_empty() {
            return Err(HistsnapError::HistoryUnavailable(format!(
                "{} has no commits",
                self.path.display()
            )));
        }

        // Discovery runs tip-first; reversing before the stable sort keeps
        // parents ahead of children that share a timestamp.
        found.reverse();
        found.sort_by_key(|(_, _, timestamp)| *timestamp);

        let timeline: Vec<CommitRef> = found
            .into_iter()
            .enumerate()
            .map(|(position, (id, author, timestamp))| CommitRef {
                id,
                author,
                timestamp,
                position,
            })
            .collect();

        debug!(commits = timeline.len(), "timeline loaded");
        Ok(timeline)
    }

    fn parse_id(&self, hex: &str) -> Result<ObjectId> {
        ObjectId::from_hex(hex.as_bytes()).map_err(|e| {
            HistsnapError::HistoryUnavailable(format!("Invalid commit ID {hex}: {e}"))
        })
    }

    fn changed_paths(&self, commit_id: ObjectId) -> Result<Vec<String>> {
        let commit = self.repo.find_commit(commit_id)?;
        let commit_tree = commit.tree()?;

        let parent_tree = match commit.parent_ids().next() {
            Some(parent_id) => Some(self.repo.find_commit(parent_id)?.tree()?),
            None => None,
        };

        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut paths = Vec::with_capacity(changes.len());
        for change in changes {
            match change {
                ChangeDetached::Addition { location, .. }
                | ChangeDetached::Deletion { location, .. }
                | ChangeDetached::Modification { location, .. } => {
                    paths.push(location.to_string());
                }
                ChangeDetached::Rewrite {
                    source_location,
                    location,
                    ..
                } => {
                    paths.push(source_location.to_string());
                    paths.push(location.to_string());
                }
            }
        }
        Ok(paths)
    }

    fn committed_files(&self, commit_id: ObjectId) -> Result<Vec<String>> {
        let tree = self.repo.find_commit(commit_id)?.tree()?;
        let mut files: Vec<String> = tree
            .traverse()
            .breadthfirst
            .files()?
            .into_iter()
            .filter(|entry| entry.mode.is_blob())
            .map(|entry| entry.filepath.to_string())
            .collect();
        files.sort();
        Ok(files)
    }
}

impl TreeSource for GitRepo {
    fn files_at(&self, commit: &CommitRef) -> Result<Vec<String>> {
        let id = self.parse_id(&commit.id)?;
        self.committed_files(id)
    }
}

impl ChangeSource for GitRepo {
    fn touched_paths(&self, commit: &CommitRef) -> Result<Vec<String>> {
        let id = self.parse_id(&commit.id)?;
        self.changed_paths(id)
    }
}
