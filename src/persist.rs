use crate::error::Result;
use crate::remote::RepoIdentity;
use crate::util::filter_suffix;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which export a default output path is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    History,
    Current,
}

/// `<workspace>/<owner>/json/<name>[_<Author_Name>][_history].json`
pub fn default_output_path(
    workspace: &Path,
    identity: &RepoIdentity,
    author_filter: Option<&str>,
    kind: ExportKind,
) -> PathBuf {
    let mut stem = identity.name.clone();
    if let Some(author) = author_filter {
        stem.push('_');
        stem.push_str(&filter_suffix(author));
    }
    if kind == ExportKind::History {
        stem.push_str("_history");
    }

    workspace
        .join(&identity.owner)
        .join("json")
        .join(format!("{stem}.json"))
}

/// Write `value` as two-space indented UTF-8 JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    std::fs::write(path, text)?;
    Ok(())
}
