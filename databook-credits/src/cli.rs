///
/// This module implements the CLI interface for databook-credits: command parsing,
/// argument validation and the `run` entrypoint.
///
/// All pipeline logic (history, aliases, roster, merging, patching, directives) lives
/// in the [`databook-credits-core`] crate. This module only loads configuration,
/// builds the git and roster sources and prints results.
///
/// ## How To Use
/// - For command-line users: use the installed `databook-credits` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`databook-credits-core`]: ../../databook-credits-core/
use crate::load_config::{load_config, CliConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use databook_credits_core::contract::{History, RosterSource};
use databook_credits_core::directive::{expand_directives, DirectiveContext, Node};
use databook_credits_core::history::GitHistory;
use databook_credits_core::patch::{write_atomic, PatchOutcome};
use databook_credits_core::pipeline::{attribute, insert_authors};
use databook_credits_core::roster::CsvRoster;
use std::fs;
use std::path::PathBuf;

/// CLI for databook-credits: contributor lists from git history and a roster.
#[derive(Parser)]
#[clap(
    name = "databook-credits",
    version,
    about = "Derive contributor lists from git history and a roster, and publish them into documentation"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, env = "DATABOOK_CREDITS_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the ordered contributor list
    List {
        /// Print a JSON array of {name, commits} instead of a comma-joined line
        #[clap(long)]
        json: bool,
    },
    /// Rewrite the author section between the document's markers
    Insert {
        /// Document to patch, overriding the config file
        #[clap(long)]
        document: Option<PathBuf>,
    },
    /// Expand contributor and version directives in a markdown file
    Render {
        #[clap(long)]
        input: PathBuf,
        /// Write here instead of stdout
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Print the latest release tag
    Version {
        /// Render the tag as a markdown link to this URI
        #[clap(long)]
        link: Option<String>,
    },
}

/// Sources built from the loaded config.
struct Sources {
    history: GitHistory,
    roster: Option<CsvRoster>,
}

impl Sources {
    fn from_config(config: &CliConfig) -> Result<Self> {
        let roster = match &config.roster {
            Some(section) => {
                let delimiter = u8::try_from(section.delimiter).with_context(|| {
                    format!("Roster delimiter {:?} must be a single byte", section.delimiter)
                })?;
                Some(CsvRoster::new(&section.path).with_delimiter(delimiter))
            }
            None => None,
        };
        Ok(Self {
            history: GitHistory::new(&config.repository),
            roster,
        })
    }

    fn roster(&self) -> Option<&dyn RosterSource> {
        self.roster.as_ref().map(|r| r as &dyn RosterSource)
    }
}

/// CLI logic entrypoint for integration tests and main()
pub fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CliConfig::from_env(),
    };
    let sources = Sources::from_config(&config)?;

    let result = match cli.command {
        Commands::List { json } => {
            let report = attribute(&sources.history, sources.roster(), &config.attribution)?;
            tracing::info!(command = "list", contributors = report.contributors.len(), "Attribution complete");
            if json {
                println!("{}", serde_json::to_string_pretty(&report.contributors)?);
            } else {
                println!("{}", report.joined());
            }
            Ok(())
        }
        Commands::Insert { document } => {
            let mut target = config
                .document
                .clone()
                .context("No document configured: add a `document` section or pass --document")?;
            if let Some(path) = document {
                target.path = path;
            }
            let (report, outcome) =
                insert_authors(&sources.history, sources.roster(), &config.attribution, &target)?;
            match outcome {
                PatchOutcome::Patched => println!(
                    "Updated {} with {} contributors",
                    target.path.display(),
                    report.contributors.len()
                ),
                PatchOutcome::Unchanged => println!("{} already up to date", target.path.display()),
                PatchOutcome::MissingPlaceholder => println!(
                    "No {} ... {} region in {}, nothing written",
                    target.start_marker,
                    target.end_marker,
                    target.path.display()
                ),
            }
            Ok(())
        }
        Commands::Render { input, output } => {
            let page = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let ctx = DirectiveContext {
                history: &sources.history,
                roster: sources.roster(),
                defaults: &config.attribution,
            };
            let rendered = expand_directives(&page, &ctx)
                .with_context(|| format!("Failed to render directives in {}", input.display()))?;
            match output {
                Some(path) => {
                    write_atomic(&path, &rendered)?;
                    tracing::info!(command = "render", output = %path.display(), "Rendered page written");
                }
                None => print!("{rendered}"),
            }
            Ok(())
        }
        Commands::Version { link } => {
            let tag = sources.history.latest_tag()?;
            let node = match link {
                Some(uri) => Node::Reference { text: tag, uri },
                None => Node::Text(tag),
            };
            println!("{}", node.to_markdown());
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
