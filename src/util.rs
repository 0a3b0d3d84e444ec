use std::path::{Component, Path};

/// Forward-slash form of `path` relative to `root`. `None` when `path` lies
/// outside `root`.
pub fn normalize_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| extensions.iter().any(|ext| name.ends_with(ext.as_str())))
        .unwrap_or(false)
}

pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8192).any(|&b| b == 0)
}

/// `"Jane Doe"` → `"Jane_Doe"`, used to build output file names.
pub fn filter_suffix(author: &str) -> String {
    author.split_whitespace().collect::<Vec<_>>().join("_")
}
