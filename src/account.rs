use crate::cli::CommonArgs;
use crate::history::export_source;
use crate::remote::{GithubLister, RepoSource};
use anyhow::Context;
use console::style;
use tracing::info;

/// Export the sampled history of every repository owned by `account`, in
/// listing order. The first repository that fails aborts the run.
pub fn exec(
    common: CommonArgs,
    account: String,
    samples: usize,
    token: Option<String>,
    api_base: Option<String>,
    list: bool,
) -> anyhow::Result<()> {
    let lister = GithubLister::new(api_base, token);
    let urls = lister
        .clone_urls(&account)
        .with_context(|| format!("Failed to list repositories of {account}"))?;

    if list {
        for url in &urls {
            println!("{url}");
        }
        return Ok(());
    }

    for url in &urls {
        info!("exporting {url}");
        let source = RepoSource::parse(url)?;
        let written = export_source(&common, &source, samples, None)
            .with_context(|| format!("Export of {url} failed"))?;
        println!(
            "{} {} ({} snapshots) → {}",
            style("✔").green(),
            url,
            written.history.len(),
            written.path.display()
        );
    }

    Ok(())
}
