/// `load_config` module: Loads a YAML config file into the CLI's [`CliConfig`].
///
/// This module is the only place where user-supplied YAML is parsed and mapped to the
/// strongly-typed configuration of `databook-credits-core`.
///
/// # Responsibilities
/// - Parse the config file into type-safe Rust structs
/// - Resolve relative paths against the directory holding the config file
/// - Apply the `DATABOOK_CREDITS_REPO` environment override
/// - Validate the alias table (no chained aliases)
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use databook_credits_core::config::{AttributionConfig, DocumentTarget};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Overrides `repository` from the config file.
pub const REPO_ENV: &str = "DATABOOK_CREDITS_REPO";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Git working directory whose history is read.
    #[serde(default = "default_repository")]
    pub repository: PathBuf,
    #[serde(default)]
    pub roster: Option<RosterSection>,
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub document: Option<DocumentTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterSection {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            roster: None,
            attribution: AttributionConfig::default(),
            document: None,
        }
    }
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}

fn default_delimiter() -> char {
    ','
}

impl CliConfig {
    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(repo) = std::env::var(REPO_ENV) {
            info!(repository = %repo, "Repository overridden from environment");
            self.repository = PathBuf::from(repo);
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        let absolutise = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        absolutise(&mut self.repository);
        if let Some(roster) = self.roster.as_mut() {
            absolutise(&mut roster.path);
        }
        if let Some(document) = self.document.as_mut() {
            absolutise(&mut document.path);
        }
    }
}

/// Loads a YAML config file and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    config.apply_env();

    config
        .attribution
        .aliases
        .validate()
        .with_context(|| format!("Invalid aliases in {}", path_ref.display()))?;
    config.attribution.trace_loaded();

    Ok(config)
}
