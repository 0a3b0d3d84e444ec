use super::repo::PRIMARY_BRANCHES;
use crate::error::{HistsnapError, Result};
use crate::model::CommitRef;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// The one mutable checkout shared by every snapshot of an export.
pub trait Worktree {
    fn root(&self) -> &Path;

    /// Fail when tracked files are modified or untracked files are present.
    fn check_clean(&self) -> Result<()>;

    /// Branch HEAD points at, `None` when detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Make the on-disk files match `commit`.
    fn materialize(&mut self, commit: &CommitRef) -> Result<()>;

    /// Put the checkout back on `main`, else `master`, else `home`,
    /// returning the branch name.
    fn restore(&mut self, home: Option<&str>) -> Result<String>;
}

/// Drives checkouts through the `git` executable.
pub struct GitWorktree {
    root: PathBuf,
}

impl GitWorktree {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn git(&self, args: &[&str]) -> std::result::Result<String, String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| format!("failed to run git: {e}"))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

impl Worktree for GitWorktree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn check_clean(&self) -> Result<()> {
        let status = self
            .git(&["status", "--porcelain", "--untracked-files=all"])
            .map_err(|reason| HistsnapError::CheckoutFailed {
                commit: "HEAD".to_string(),
                reason,
            })?;

        if status.is_empty() {
            return Ok(());
        }
        let changed: Vec<&str> = status.lines().take(5).collect();
        Err(HistsnapError::CheckoutFailed {
            commit: "HEAD".to_string(),
            reason: format!(
                "working tree has {} local change(s): {}",
                status.lines().count(),
                changed.join(", ")
            ),
        })
    }

    fn current_branch(&self) -> Result<Option<String>> {
        // exits non-zero on a detached HEAD
        Ok(self
            .git(&["symbolic-ref", "--quiet", "--short", "HEAD"])
            .ok()
            .filter(|name| !name.is_empty()))
    }

    fn materialize(&mut self, commit: &CommitRef) -> Result<()> {
        debug!(commit = %commit.id, position = commit.position, "checking out");
        self.git(&["checkout", "--quiet", &commit.id])
            .map(|_| ())
            .map_err(|reason| HistsnapError::CheckoutFailed {
                commit: commit.id.clone(),
                reason,
            })
    }

    fn restore(&mut self, home: Option<&str>) -> Result<String> {
        let mut candidates: Vec<&str> = PRIMARY_BRANCHES.to_vec();
        if let Some(home) = home {
            if !candidates.contains(&home) {
                candidates.push(home);
            }
        }

        let mut failures = Vec::new();
        for branch in candidates {
            match self.git(&["checkout", "--quiet", branch]) {
                Ok(_) => {
                    debug!(branch, "restored branch");
                    return Ok(branch.to_string());
                }
                Err(reason) => failures.push(format!("{branch}: {reason}")),
            }
        }
        Err(HistsnapError::RestoreFailed(failures.join("; ")))
    }
}

/// Exclusive hold on a [`Worktree`] for the length of a sampling loop.
///
/// Acquisition refuses a dirty tree and remembers the branch HEAD was on.
/// The branch is restored exactly once, either through
/// [`CheckoutGuard::release`] or when the guard is dropped while unwinding.
pub struct CheckoutGuard<'a, W: Worktree + ?Sized> {
    worktree: &'a mut W,
    home: Option<String>,
    released: bool,
}

impl<'a, W: Worktree + ?Sized> CheckoutGuard<'a, W> {
    pub fn acquire(worktree: &'a mut W) -> Result<Self> {
        worktree.check_clean()?;
        let home = worktree.current_branch()?;
        if home.is_none() {
            warn!("HEAD is detached, restoring will only try the primary branch names");
        }
        Ok(Self {
            worktree,
            home,
            released: false,
        })
    }

    pub fn root(&self) -> &Path {
        self.worktree.root()
    }

    pub fn home(&self) -> Option<&str> {
        self.home.as_deref()
    }

    pub fn materialize(&mut self, commit: &CommitRef) -> Result<()> {
        self.worktree.materialize(commit)
    }

    pub fn release(mut self) -> Result<String> {
        self.released = true;
        self.worktree.restore(self.home.as_deref())
    }
}

impl<W: Worktree + ?Sized> Drop for CheckoutGuard<'_, W> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.worktree.restore(self.home.as_deref()) {
                warn!("restoring branch during unwind failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct CountingTree {
        dirty: bool,
        branch: Option<String>,
        restores: Vec<Option<String>>,
    }

    impl Worktree for CountingTree {
        fn root(&self) -> &Path {
            Path::new(".")
        }

        fn check_clean(&self) -> Result<()> {
            if self.dirty {
                return Err(HistsnapError::CheckoutFailed {
                    commit: "HEAD".into(),
                    reason: "?? scratch.py".into(),
                });
            }
            Ok(())
        }

        fn current_branch(&self) -> Result<Option<String>> {
            Ok(self.branch.clone())
        }

        fn materialize(&mut self, _commit: &CommitRef) -> Result<()> {
            Ok(())
        }

        fn restore(&mut self, home: Option<&str>) -> Result<String> {
            self.restores.push(home.map(str::to_string));
            Ok(home.unwrap_or("main").to_string())
        }
    }

    fn commit() -> CommitRef {
        CommitRef {
            id: "abc".into(),
            author: "Alice".into(),
            timestamp: Utc::now(),
            position: 0,
        }
    }

    #[test]
    fn release_restores_once_to_home_branch() {
        let mut tree = CountingTree {
            branch: Some("develop".into()),
            ..Default::default()
        };
        let mut guard = CheckoutGuard::acquire(&mut tree).unwrap();
        assert_eq!(guard.home(), Some("develop"));
        guard.materialize(&commit()).unwrap();
        assert_eq!(guard.release().unwrap(), "develop");
        assert_eq!(tree.restores, vec![Some("develop".to_string())]);
    }

    #[test]
    fn drop_restores_when_not_released() {
        let mut tree = CountingTree::default();
        {
            let mut guard = CheckoutGuard::acquire(&mut tree).unwrap();
            guard.materialize(&commit()).unwrap();
        }
        assert_eq!(tree.restores.len(), 1);
    }

    #[test]
    fn dirty_tree_is_refused_without_touching_it() {
        let mut tree = CountingTree {
            dirty: true,
            ..Default::default()
        };
        assert!(matches!(
            CheckoutGuard::acquire(&mut tree),
            Err(HistsnapError::CheckoutFailed { .. })
        ));
        assert!(tree.restores.is_empty());
    }
}
