use crate::error::{HistsnapError, Result};
use crate::model::{AuthorIndex, CommitRef, FileRecord, Snapshot};
use crate::util::{looks_binary, matches_extension, normalize_path};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lists the paths a commit's tree holds, relative to the repository root.
pub trait TreeSource {
    fn files_at(&self, commit: &CommitRef) -> Result<Vec<String>>;
}

/// Every source file on disk under `root`, sorted by path.
///
/// Ignore files play no part: a file matched by `.gitignore` is still listed.
pub fn enumerate_code_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| matches_extension(path, extensions))
        .collect();

    files.sort();
    files
}

fn read_record(root: &Path, path: &Path, index: &AuthorIndex) -> Result<FileRecord> {
    let file = normalize_path(root, path).ok_or_else(|| HistsnapError::FileReadFailed {
        path: path.to_path_buf(),
        reason: "outside of the repository root".to_string(),
    })?;

    let bytes = std::fs::read(path).map_err(|e| HistsnapError::FileReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if looks_binary(&bytes) {
        return Err(HistsnapError::FileReadFailed {
            path: path.to_path_buf(),
            reason: "content is not decodable as text".to_string(),
        });
    }

    let content = String::from_utf8_lossy(&bytes).into_owned();
    let authors = index.authors_of(&file);
    Ok(FileRecord {
        file,
        content,
        authors,
    })
}

/// Read `files`, attach authors from `index`, and keep only records touched
/// by `author_filter` when one is given. Unreadable files are skipped.
pub fn assemble_files(
    root: &Path,
    files: &[PathBuf],
    index: &AuthorIndex,
    author_filter: Option<&str>,
) -> Vec<FileRecord> {
    let mut records = Vec::with_capacity(files.len());

    for path in files {
        let record = match read_record(root, path, index) {
            Ok(record) => record,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };

        if let Some(name) = author_filter {
            if !record.authors.contains(name) {
                continue;
            }
        }
        records.push(record);
    }

    debug!(read = records.len(), candidates = files.len(), "files assembled");
    records
}

/// Source files among `committed`, resolved under `root`, sorted by path.
pub fn committed_code_files(
    root: &Path,
    committed: &[String],
    extensions: &[String],
) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = committed
        .iter()
        .map(|file| root.join(file))
        .filter(|path| matches_extension(path, extensions))
        .collect();
    files.sort();
    files
}

/// Snapshot of `commit`, reading only the files its tree records from the
/// materialized checkout at `root`.
pub fn assemble_snapshot(
    commit: &CommitRef,
    root: &Path,
    committed: &[String],
    extensions: &[String],
    index: &AuthorIndex,
    author_filter: Option<&str>,
) -> Snapshot {
    let files = committed_code_files(root, committed, extensions);
    Snapshot {
        commit: commit.clone(),
        files: assemble_files(root, &files, index, author_filter),
    }
}
