use std::path::PathBuf;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::merge::{AdditionalMatch, MergePolicy};
use crate::resolve::{AliasMap, Blacklist};

pub const DEFAULT_START_MARKER: &str = "<!-- authors start -->";
pub const DEFAULT_END_MARKER: &str = "<!-- authors end -->";

/// Attribution policy and inputs for one run. Passed explicitly into every
/// pipeline call; nothing here is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributionConfig {
    pub blacklist: Blacklist,
    pub additional_authors: IndexSet<String>,
    pub aliases: AliasMap,
    /// Roster role to include; empty means everyone except funders.
    pub role: String,
    pub additional_match: AdditionalMatch,
    /// Merge roster names into the commit-derived list.
    pub include_roster: bool,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            blacklist: Blacklist::default(),
            additional_authors: IndexSet::new(),
            aliases: AliasMap::default(),
            role: String::new(),
            additional_match: AdditionalMatch::default(),
            include_roster: true,
        }
    }
}

impl AttributionConfig {
    pub fn policy(&self) -> MergePolicy {
        MergePolicy {
            aliases: self.aliases.clone(),
            blacklist: self.blacklist.clone(),
            additional_match: self.additional_match,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            aliases = self.aliases.len(),
            additional_authors = self.additional_authors.len(),
            role = %self.role,
            include_roster = self.include_roster,
            "Loaded attribution config"
        );
        debug!(?self, "Attribution config loaded (full debug)");
    }
}

/// A document whose marker region receives the author line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTarget {
    pub path: PathBuf,
    #[serde(default = "default_start_marker")]
    pub start_marker: String,
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
}

impl DocumentTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            start_marker: default_start_marker(),
            end_marker: default_end_marker(),
        }
    }
}

fn default_start_marker() -> String {
    DEFAULT_START_MARKER.to_string()
}

fn default_end_marker() -> String {
    DEFAULT_END_MARKER.to_string()
}
