use crate::error::{HistsnapError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// Owner and repository name, used to lay out clones and exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    Local(PathBuf),
    Remote(String),
}

impl RepoSource {
    /// An existing directory is taken as a local checkout, anything that
    /// looks like a clone URL as a remote.
    pub fn parse(input: &str) -> Result<Self> {
        let path = Path::new(input);
        if path.is_dir() {
            return Ok(RepoSource::Local(path.to_path_buf()));
        }
        if input.contains("://") || input.starts_with("git@") {
            return Ok(RepoSource::Remote(input.trim_end_matches('/').to_string()));
        }
        Err(HistsnapError::InvalidSource(format!(
            "'{input}' is neither a directory nor a clone URL"
        )))
    }

    pub fn identity(&self) -> Result<RepoIdentity> {
        match self {
            RepoSource::Local(path) => {
                let absolute = path.canonicalize()?;
                let name = file_name(&absolute).ok_or_else(|| {
                    HistsnapError::InvalidSource(format!("{} has no name", path.display()))
                })?;
                let owner = absolute
                    .parent()
                    .and_then(file_name)
                    .unwrap_or_else(|| "local".to_string());
                Ok(RepoIdentity { owner, name })
            }
            RepoSource::Remote(url) => identity_from_url(url),
        }
    }

    /// Local directory holding the checkout for this source.
    pub fn checkout_dir(&self, workspace: &Path) -> Result<PathBuf> {
        match self {
            RepoSource::Local(path) => Ok(path.clone()),
            RepoSource::Remote(_) => {
                let identity = self.identity()?;
                Ok(workspace
                    .join(&identity.owner)
                    .join("repository")
                    .join(&identity.name))
            }
        }
    }

    /// Make sure the checkout exists, cloning remotes on first use.
    pub fn acquire(&self, workspace: &Path) -> Result<PathBuf> {
        let dir = self.checkout_dir(workspace)?;
        if let RepoSource::Remote(url) = self {
            ensure_cloned(url, &dir)?;
        }
        Ok(dir)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

pub fn identity_from_url(url: &str) -> Result<RepoIdentity> {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let mut parts = trimmed.rsplit(['/', ':']).filter(|p| !p.is_empty());

    match (parts.next(), parts.next()) {
        (Some(name), Some(owner)) => Ok(RepoIdentity {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(HistsnapError::InvalidSource(format!(
            "cannot derive owner and name from '{url}'"
        ))),
    }
}

/// Clone `url` into `dir` unless a checkout is already there.
///
/// An existing `dir` without a `.git` entry is an error, not a clone.
pub fn ensure_cloned(url: &str, dir: &Path) -> Result<()> {
    if dir.join(".git").exists() {
        info!("{} already cloned at {}", url, dir.display());
        return Ok(());
    }
    if dir.exists() {
        return Err(HistsnapError::AcquisitionFailed {
            source_url: url.to_string(),
            reason: format!("{} exists but is not a git checkout", dir.display()),
        });
    }
    if let Some(parent) = dir.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("cloning {} into {}", url, dir.display());
    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(dir)
        .output()
        .map_err(|e| HistsnapError::AcquisitionFailed {
            source_url: url.to_string(),
            reason: format!("failed to run git: {e}"),
        })?;

    if !output.status.success() {
        return Err(HistsnapError::AcquisitionFailed {
            source_url: url.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RemoteRepo {
    clone_url: String,
}

/// Lists an account's repositories through the GitHub REST API.
pub struct GithubLister {
    api_base: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl GithubLister {
    pub fn new(api_base: Option<String>, token: Option<String>) -> Self {
        let agent = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(Some(std::time::Duration::from_secs(60)))
            .build()
            .new_agent();

        Self {
            api_base: api_base
                .unwrap_or_else(|| GITHUB_API.to_string())
                .trim_end_matches('/')
                .to_string(),
            token,
            agent,
        }
    }

    pub fn page_url(&self, account: &str, page: usize) -> String {
        format!(
            "{}/users/{}/repos?per_page={}&page={}",
            self.api_base, account, PER_PAGE, page
        )
    }

    /// Clone URLs of every repository owned by `account`, in API order.
    pub fn clone_urls(&self, account: &str) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        let mut page = 1;

        loop {
            let url = self.page_url(account, page);
            debug!(%url, "fetching repository page");

            let mut request = self
                .agent
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .header("User-Agent", "histsnap");
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {token}"));
            }

            let response = request.call()?;
            let status = response.status();
            if !status.is_success() {
                let body = response.into_body().read_to_string().unwrap_or_default();
                return Err(HistsnapError::RemoteListing {
                    status: status.as_u16(),
                    body,
                });
            }

            let repos: Vec<RemoteRepo> = response.into_body().read_json()?;
            if repos.is_empty() {
                break;
            }
            urls.extend(repos.into_iter().map(|r| r.clone_url));
            page += 1;
        }

        info!("{} repositories listed for {}", urls.len(), account);
        Ok(urls)
    }
}
