use crate::assemble::{assemble_files, enumerate_code_files};
use crate::attribution::Attributor;
use crate::cli::CommonArgs;
use crate::git::GitRepo;
use crate::model::FileRecord;
use crate::persist::{default_output_path, write_json, ExportKind};
use crate::remote::RepoSource;
use anyhow::Context;
use console::style;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tracing::info;

/// Export the working tree as it stands, attributed with whole-history authors.
pub fn exec(
    common: CommonArgs,
    source: String,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let source = RepoSource::parse(&source).context("Failed to parse repository source")?;
    let identity = source
        .identity()
        .context("Failed to derive repository identity")?;
    let dir = source
        .acquire(&common.workspace)
        .context("Failed to acquire repository")?;

    let repo = GitRepo::open(Some(&dir)).context("Failed to open git repository")?;
    let timeline = repo.load_timeline().context("Failed to load commit timeline")?;
    let index = Attributor::new(&timeline, &repo)
        .all_authors()
        .context("Failed to attribute authors")?;

    let files = enumerate_code_files(repo.path(), &common.extensions());
    info!("{} code files detected", files.len());
    let records = assemble_files(repo.path(), &files, &index, common.author.as_deref());

    let path = output.unwrap_or_else(|| {
        default_output_path(
            &common.workspace,
            &identity,
            common.author.as_deref(),
            ExportKind::Current,
        )
    });
    write_json(&path, &records).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("export written to {}", path.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        output_summary(&records, &path)?;
    }

    Ok(())
}

fn output_summary(records: &[FileRecord], path: &std::path::Path) -> anyhow::Result<()> {
    println!("{}", style("Export Summary").bold());
    println!("{}", "─".repeat(50));

    let total_bytes: usize = records.iter().map(|r| r.content.len()).sum();
    let unattributed = records.iter().filter(|r| r.authors.is_empty()).count();

    let mut per_author: HashMap<&str, usize> = HashMap::new();
    for record in records {
        for author in &record.authors {
            *per_author.entry(author.as_str()).or_insert(0) += 1;
        }
    }
    let authors: BTreeSet<&str> = per_author.keys().copied().collect();

    println!("Files: {}", style(records.len()).cyan());
    println!("Bytes of source: {}", style(total_bytes).cyan());
    println!("Unique authors: {}", style(authors.len()).yellow());
    println!("Files without attribution: {}", style(unattributed).red());

    let mut top: Vec<_> = per_author.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (author, count) in top.into_iter().take(10) {
        println!("  {:<30} {:>6} files", author, count);
    }

    println!("\nWritten to {}", style(path.display()).bold());
    Ok(())
}
