//! High-level pipeline: history → resolve → roster → merge → publish.
//!
//! This module ties the pipeline stages together for a single run:
//!   - Reads commit records from a [`History`] (degrading to none)
//!   - Resolves aliases and drops blacklisted names
//!   - Loads the roster from a [`RosterSource`] and filters it by role
//!   - Merges everything into an ordered contributor list
//!   - Optionally patches that list into a document's placeholder region
//!
//! Every input is read fresh on each call and the policy arrives as an
//! explicit [`AttributionConfig`], so several runs with different policies can
//! share a process.
//!
//! # Error Handling
//! Roster read failures are returned to the caller. A missing history is
//! logged and treated as empty. A missing placeholder is reported through
//! [`PatchOutcome::MissingPlaceholder`].

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AttributionConfig, DocumentTarget};
use crate::contract::{History, RosterSource};
use crate::error::Result;
use crate::merge::{merge_contributors, Contributor};
use crate::patch::{patch_file, PatchOutcome};
use crate::resolve::resolve;
use crate::roster::filter_by_role;

#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    /// Distinct raw committer names read from history.
    pub committers_read: usize,
    /// Roster names selected by role.
    pub roster_selected: usize,
    pub contributors: Vec<Contributor>,
}

impl AttributionReport {
    pub fn names(&self) -> Vec<String> {
        self.contributors.iter().map(Contributor::to_string).collect()
    }

    /// Comma-joined names, the text of the author line.
    pub fn joined(&self) -> String {
        self.names().join(", ")
    }

    /// Markdown emphasis line written into author placeholders.
    pub fn emphasis_line(&self) -> String {
        if self.contributors.is_empty() {
            return String::new();
        }
        format!("*{}*", self.joined())
    }
}

/// Runs the attribution pipeline once.
pub fn attribute<H, R>(
    history: &H,
    roster: Option<&R>,
    config: &AttributionConfig,
) -> Result<AttributionReport>
where
    H: History + ?Sized,
    R: RosterSource + ?Sized,
{
    info!("[ATTRIBUTE] Starting contributor attribution");

    let records = history.shortlog();
    if records.is_empty() {
        warn!("[ATTRIBUTE] No commit history available, using roster and additional names only");
    }
    let resolved = resolve(&records, &config.aliases, &config.blacklist);

    let roster_names = match roster {
        Some(source) if config.include_roster => {
            let entries = source.load()?;
            filter_by_role(&entries, &config.role)
        }
        _ => IndexSet::new(),
    };

    let contributors = merge_contributors(
        &resolved,
        &roster_names,
        &config.additional_authors,
        &config.policy(),
    );
    info!(
        committers = records.len(),
        roster = roster_names.len(),
        contributors = contributors.len(),
        "[ATTRIBUTE] Attribution complete"
    );

    Ok(AttributionReport {
        committers_read: records.len(),
        roster_selected: roster_names.len(),
        contributors,
    })
}

/// Runs the pipeline and writes the author line into `target`.
pub fn insert_authors<H, R>(
    history: &H,
    roster: Option<&R>,
    config: &AttributionConfig,
    target: &DocumentTarget,
) -> Result<(AttributionReport, PatchOutcome)>
where
    H: History + ?Sized,
    R: RosterSource + ?Sized,
{
    let report = attribute(history, roster, config)?;
    let outcome = patch_file(
        &target.path,
        &target.start_marker,
        &target.end_marker,
        &report.emphasis_line(),
    )?;
    info!(path = %target.path.display(), ?outcome, "[INSERT] Author section processed");
    Ok((report, outcome))
}
