use crate::assemble::{assemble_snapshot, TreeSource};
use crate::attribution::{Attributor, ChangeSource};
use crate::cli::CommonArgs;
use crate::error::Result;
use crate::git::{CheckoutGuard, GitRepo, GitWorktree, Worktree};
use crate::model::{CommitRef, SnapshotHistory};
use crate::persist::{default_output_path, write_json, ExportKind};
use crate::remote::RepoSource;
use crate::sample::sample_commits;
use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_SAMPLES: usize = 10;

#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub samples: usize,
    pub extensions: Vec<String>,
    pub author_filter: Option<String>,
}

/// Walks sampled commits through one shared worktree.
pub struct HistoryExporter<'a, C: ChangeSource + TreeSource + ?Sized, W: Worktree + ?Sized> {
    timeline: &'a [CommitRef],
    changes: &'a C,
    worktree: &'a mut W,
    options: &'a HistoryOptions,
}

impl<'a, C, W> HistoryExporter<'a, C, W>
where
    C: ChangeSource + TreeSource + ?Sized,
    W: Worktree + ?Sized,
{
    pub fn new(
        timeline: &'a [CommitRef],
        changes: &'a C,
        worktree: &'a mut W,
        options: &'a HistoryOptions,
    ) -> Self {
        Self {
            timeline,
            changes,
            worktree,
            options,
        }
    }

    /// Build one snapshot per sampled commit, oldest first.
    ///
    /// A worktree with local changes is refused before any checkout. Once
    /// sampling starts, the worktree is put back on its primary branch (or
    /// the branch it started on) before this returns, whether or not every
    /// snapshot succeeded.
    pub fn run(self) -> Result<SnapshotHistory> {
        let sample = sample_commits(self.timeline, self.options.samples)?;
        let mut attributor = Attributor::new(self.timeline, self.changes);

        let pb = ProgressBar::new(sample.commits.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut guard = CheckoutGuard::acquire(self.worktree)?;
        let mut history = Vec::with_capacity(sample.commits.len());

        let outcome = build_snapshots(
            &sample.commits,
            self.changes,
            &mut attributor,
            &mut guard,
            self.options,
            &mut history,
            &pb,
        );
        pb.finish_and_clear();

        let restored = guard.release();
        match (outcome, restored) {
            (Ok(()), Ok(branch)) => {
                info!(branch = %branch, snapshots = history.len(), "history export complete");
                Ok(history)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(branch)) => {
                warn!(branch = %branch, "export aborted, primary branch restored");
                Err(e)
            }
            (Err(e), Err(restore)) => {
                warn!("export aborted and restoring the primary branch also failed: {restore}");
                Err(e)
            }
        }
    }
}

fn build_snapshots<C: ChangeSource + TreeSource + ?Sized, W: Worktree + ?Sized>(
    commits: &[CommitRef],
    trees: &C,
    attributor: &mut Attributor<'_, C>,
    guard: &mut CheckoutGuard<'_, W>,
    options: &HistoryOptions,
    history: &mut SnapshotHistory,
    pb: &ProgressBar,
) -> Result<()> {
    for commit in commits {
        pb.set_message(commit.id.chars().take(8).collect::<String>());
        guard.materialize(commit)?;
        let committed = trees.files_at(commit)?;
        let index = attributor.authors_up_to(commit)?;
        debug!(commit = %commit.id, attributed_paths = index.len(), "authors indexed");
        let snapshot = assemble_snapshot(
            commit,
            guard.root(),
            &committed,
            &options.extensions,
            &index,
            options.author_filter.as_deref(),
        );
        history.push(snapshot);
        pb.inc(1);
    }
    Ok(())
}

/// Export the sampled history of the repository checked out at `dir`.
pub fn export_repository(dir: &Path, options: &HistoryOptions) -> Result<SnapshotHistory> {
    let repo = GitRepo::open(Some(dir))?;
    let timeline = repo.load_timeline()?;
    info!(
        "{} commits in {}, sampling {}",
        timeline.len(),
        repo.path().display(),
        options.samples
    );

    let mut worktree = GitWorktree::new(repo.path());
    HistoryExporter::new(&timeline, &repo, &mut worktree, options).run()
}

pub fn exec(
    common: CommonArgs,
    source: String,
    samples: usize,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let source = RepoSource::parse(&source).context("Failed to parse repository source")?;
    let written = export_source(&common, &source, samples, output)?;

    if json {
        let text = std::fs::read_to_string(&written.path)
            .with_context(|| format!("Failed to read back {}", written.path.display()))?;
        print!("{text}");
    } else {
        output_summary(&written)?;
    }
    Ok(())
}

pub struct WrittenHistory {
    pub path: PathBuf,
    pub history: SnapshotHistory,
}

/// Acquire `source`, export its history and persist it.
pub fn export_source(
    common: &CommonArgs,
    source: &RepoSource,
    samples: usize,
    output: Option<PathBuf>,
) -> anyhow::Result<WrittenHistory> {
    let identity = source
        .identity()
        .context("Failed to derive repository identity")?;
    let dir = source
        .acquire(&common.workspace)
        .context("Failed to acquire repository")?;

    let options = HistoryOptions {
        samples,
        extensions: common.extensions(),
        author_filter: common.author.clone(),
    };

    let history = export_repository(&dir, &options).context("History export failed")?;

    let path = output.unwrap_or_else(|| {
        default_output_path(
            &common.workspace,
            &identity,
            common.author.as_deref(),
            ExportKind::History,
        )
    });
    write_json(&path, &history)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("history written to {}", path.display());

    Ok(WrittenHistory { path, history })
}

fn output_summary(written: &WrittenHistory) -> anyhow::Result<()> {
    let history = &written.history;

    println!("{}", style("History Export Summary").bold());
    println!("{}", "─".repeat(50));

    let total_files: usize = history.iter().map(|s| s.files.len()).sum();
    let authors: BTreeSet<&str> = history
        .iter()
        .flat_map(|s| &s.files)
        .flat_map(|f| f.authors.iter().map(String::as_str))
        .collect();

    println!("Snapshots: {}", style(history.len()).cyan());
    println!("File records: {}", style(total_files).cyan());
    println!("Distinct authors: {}", style(authors.len()).yellow());

    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        println!(
            "Date range: {} to {}",
            style(first.commit.timestamp.format("%Y-%m-%d")).dim(),
            style(last.commit.timestamp.format("%Y-%m-%d")).dim()
        );
    }

    for snapshot in history {
        println!(
            "  {} {} {:>5} files  {}",
            style(&snapshot.commit.id[..snapshot.commit.id.len().min(8)]).green(),
            snapshot.commit.timestamp.format("%Y-%m-%d"),
            snapshot.files.len(),
            snapshot.commit.author
        );
    }

    println!("\nWritten to {}", style(written.path.display()).bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistsnapError;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    type Files = HashMap<String, Vec<(&'static str, &'static str)>>;

    /// Writes each commit's files into a temp dir instead of running git.
    struct ScriptedTree {
        dir: TempDir,
        trees: Files,
        fail_on: Option<String>,
        dirty: bool,
        restores: usize,
    }

    impl Worktree for ScriptedTree {
        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn check_clean(&self) -> Result<()> {
            if self.dirty {
                return Err(HistsnapError::CheckoutFailed {
                    commit: "HEAD".to_string(),
                    reason: "?? scratch.py".to_string(),
                });
            }
            Ok(())
        }

        fn current_branch(&self) -> Result<Option<String>> {
            Ok(Some("develop".to_string()))
        }

        fn materialize(&mut self, commit: &CommitRef) -> Result<()> {
            if self.fail_on.as_deref() == Some(commit.id.as_str()) {
                return Err(HistsnapError::CheckoutFailed {
                    commit: commit.id.clone(),
                    reason: "local changes would be overwritten".to_string(),
                });
            }
            for entry in fs::read_dir(self.dir.path())? {
                fs::remove_file(entry?.path())?;
            }
            for (name, content) in self.trees.get(&commit.id).into_iter().flatten() {
                fs::write(self.dir.path().join(name), content)?;
            }
            Ok(())
        }

        fn restore(&mut self, home: Option<&str>) -> Result<String> {
            self.restores += 1;
            Ok(home.unwrap_or("main").to_string())
        }
    }

    struct Touches {
        changes: HashMap<String, Vec<String>>,
        trees: Files,
    }

    impl ChangeSource for Touches {
        fn touched_paths(&self, commit: &CommitRef) -> Result<Vec<String>> {
            Ok(self.changes.get(&commit.id).cloned().unwrap_or_default())
        }
    }

    impl TreeSource for Touches {
        fn files_at(&self, commit: &CommitRef) -> Result<Vec<String>> {
            Ok(self
                .trees
                .get(&commit.id)
                .into_iter()
                .flatten()
                .map(|(name, _)| name.to_string())
                .collect())
        }
    }

    fn commit(position: usize, author: &str) -> CommitRef {
        CommitRef {
            id: format!("c{position}"),
            author: author.to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + position as i64 * 3600, 0)
                .unwrap(),
            position,
        }
    }

    fn fixture() -> (Vec<CommitRef>, Touches, ScriptedTree) {
        let timeline = vec![commit(0, "Bob"), commit(1, "Alice"), commit(2, "Bob")];
        let trees: Files = HashMap::from([
            ("c0".to_string(), vec![("a.py", "a = 0\n")]),
            ("c1".to_string(), vec![("a.py", "a = 0\n"), ("b.py", "b = 1\n")]),
            ("c2".to_string(), vec![("a.py", "a = 2\n"), ("b.py", "b = 1\n")]),
        ]);
        let touches = Touches {
            changes: HashMap::from([
                ("c0".to_string(), vec!["a.py".to_string()]),
                ("c1".to_string(), vec!["b.py".to_string()]),
                ("c2".to_string(), vec!["a.py".to_string()]),
            ]),
            trees: trees.clone(),
        };
        let tree = ScriptedTree {
            dir: tempdir().unwrap(),
            trees,
            fail_on: None,
            dirty: false,
            restores: 0,
        };
        (timeline, touches, tree)
    }

    fn options(samples: usize, author: Option<&str>) -> HistoryOptions {
        HistoryOptions {
            samples,
            extensions: vec![".py".to_string()],
            author_filter: author.map(str::to_string),
        }
    }

    #[test]
    fn snapshots_follow_the_timeline_without_future_authors() {
        let (timeline, touches, mut tree) = fixture();
        let opts = options(10, None);
        let history = HistoryExporter::new(&timeline, &touches, &mut tree, &opts)
            .run()
            .unwrap();

        assert_eq!(history.len(), 3);
        let ids: Vec<&str> = history.iter().map(|s| s.commit.id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);

        for snapshot in &history {
            let allowed: BTreeSet<&str> = timeline
                .iter()
                .filter(|c| c.timestamp <= snapshot.commit.timestamp)
                .map(|c| c.author.as_str())
                .collect();
            for file in &snapshot.files {
                assert!(file.authors.iter().all(|a| allowed.contains(a.as_str())));
            }
        }

        assert_eq!(history[0].files.len(), 1);
        assert_eq!(history[2].files[1].content, "b = 1\n");
        assert_eq!(tree.restores, 1);
    }

    #[test]
    fn author_filter_empties_snapshots_before_first_contribution() {
        let (timeline, touches, mut tree) = fixture();
        let opts = options(3, Some("Alice"));
        let history = HistoryExporter::new(&timeline, &touches, &mut tree, &opts)
            .run()
            .unwrap();

        assert!(history[0].files.is_empty());
        let later: Vec<&str> = history[1].files.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(later, vec!["b.py"]);
    }

    #[test]
    fn checkout_failure_still_restores() {
        let (timeline, touches, mut tree) = fixture();
        tree.fail_on = Some("c1".to_string());
        let opts = options(3, None);
        let result = HistoryExporter::new(&timeline, &touches, &mut tree, &opts).run();

        assert!(matches!(result, Err(HistsnapError::CheckoutFailed { .. })));
        assert_eq!(tree.restores, 1);
    }

    #[test]
    fn dirty_worktree_is_refused_before_any_checkout() {
        let (timeline, touches, mut tree) = fixture();
        tree.dirty = true;
        fs::write(tree.dir.path().join("scratch.py"), "local = True\n").unwrap();
        let opts = options(3, None);
        let result = HistoryExporter::new(&timeline, &touches, &mut tree, &opts).run();

        assert!(matches!(result, Err(HistsnapError::CheckoutFailed { .. })));
        assert_eq!(tree.restores, 0);
        assert_eq!(
            fs::read_to_string(tree.dir.path().join("scratch.py")).unwrap(),
            "local = True\n"
        );
    }

    #[test]
    fn stray_files_in_the_worktree_stay_out_of_snapshots() {
        let (timeline, touches, mut tree) = fixture();
        // left behind by the checkout, never part of any commit
        tree.trees
            .get_mut("c2")
            .unwrap()
            .push(("generated.py", "build = 1\n"));
        let opts = options(10, None);
        let history = HistoryExporter::new(&timeline, &touches, &mut tree, &opts)
            .run()
            .unwrap();

        let last: Vec<&str> = history[2].files.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(last, vec!["a.py", "b.py"]);
    }
}
