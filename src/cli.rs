use crate::history::DEFAULT_SAMPLES;
use crate::model::DEFAULT_EXTENSIONS;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "histsnap")]
#[command(about = "Time-sampled code snapshots with per-file author attribution")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Directory holding clones (<owner>/repository) and exports (<owner>/json)"
    )]
    pub workspace: PathBuf,

    #[arg(
        long = "ext",
        global = true,
        value_delimiter = ',',
        help = "Recognized source extensions, e.g. .py,.rs (defaults to a common set)"
    )]
    pub ext: Vec<String>,

    #[arg(long, global = true, help = "Keep only files this author has touched")]
    pub author: Option<String>,
}

impl CommonArgs {
    /// Extensions with a leading dot, falling back to the default set.
    pub fn extensions(&self) -> Vec<String> {
        if self.ext.is_empty() {
            return DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        }
        self.ext
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(|e| {
                if e.starts_with('.') {
                    e.to_string()
                } else {
                    format!(".{e}")
                }
            })
            .collect()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export evenly spaced snapshots across the repository's history
    History {
        #[arg(help = "Local repository directory or clone URL")]
        source: String,

        #[arg(long, short = 'n', default_value_t = DEFAULT_SAMPLES, help = "Number of snapshots")]
        samples: usize,

        #[arg(long, short, help = "Write the JSON document here instead of the workspace")]
        output: Option<PathBuf>,

        #[arg(long, help = "Also print the JSON document to stdout")]
        json: bool,
    },
    /// Export the current working tree with whole-history authors
    Snapshot {
        #[arg(help = "Local repository directory or clone URL")]
        source: String,

        #[arg(long, short, help = "Write the JSON document here instead of the workspace")]
        output: Option<PathBuf>,

        #[arg(long, help = "Also print the JSON document to stdout")]
        json: bool,
    },
    /// Export the history of every public repository of a GitHub account
    Account {
        #[arg(help = "GitHub user name")]
        name: String,

        #[arg(long, short = 'n', default_value_t = DEFAULT_SAMPLES, help = "Number of snapshots")]
        samples: usize,

        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, help = "API token")]
        token: Option<String>,

        #[arg(long, help = "API base URL (defaults to api.github.com)")]
        api_base: Option<String>,

        #[arg(long, help = "Only print the clone URLs")]
        list: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::History {
                source,
                samples,
                output,
                json,
            } => crate::history::exec(self.common, source, samples, output, json),
            Commands::Snapshot {
                source,
                output,
                json,
            } => crate::export::exec(self.common, source, output, json),
            Commands::Account {
                name,
                samples,
                token,
                api_base,
                list,
            } => crate::account::exec(self.common, name, samples, token, api_base, list),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extensions_gain_a_leading_dot() {
        let cli = Cli::try_parse_from(["histsnap", "--ext", "py,.rs", "history", "."]).unwrap();
        assert_eq!(cli.common.extensions(), vec![".py".to_string(), ".rs".to_string()]);
    }

    #[test]
    fn default_extensions_and_samples() {
        let cli = Cli::try_parse_from(["histsnap", "history", "repo"]).unwrap();
        assert!(cli.common.extensions().contains(&".ipynb".to_string()));
        match cli.command {
            Commands::History { samples, .. } => assert_eq!(samples, DEFAULT_SAMPLES),
            _ => panic!("expected history command"),
        }
    }
}
