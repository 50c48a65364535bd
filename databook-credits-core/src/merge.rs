//! Contributor merger: commit history, roster and explicit names into one
//! ordered list.
//!
//! Commit-derived contributors render as `Name (count)`, everyone else as
//! `Name`. A roster name that also has commits keeps its count. The list is
//! ordered by last name.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolve::{AliasMap, Blacklist};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub name: String,
    /// `None` for contributors known only from the roster or configuration.
    pub commits: Option<u64>,
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.commits {
            Some(count) => write!(f, "{} ({})", self.name, count),
            None => f.write_str(&self.name),
        }
    }
}

/// How explicitly configured names are matched against derived ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalMatch {
    /// Collapse only when the rendered strings are identical, so `Amy` and
    /// `Amy (3)` both survive.
    #[default]
    Exact,
    /// Alias-resolve the name and collapse it into any derived contributor
    /// with the same canonical name.
    Canonical,
}

/// Attribution policy for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct MergePolicy {
    pub aliases: AliasMap,
    pub blacklist: Blacklist,
    pub additional_match: AdditionalMatch,
}

/// Merges and renders, see [`merge_contributors`].
pub fn merge(
    commit_contributors: &IndexMap<String, u64>,
    roster_names: &IndexSet<String>,
    additional: &IndexSet<String>,
    policy: &MergePolicy,
) -> Vec<String> {
    merge_contributors(commit_contributors, roster_names, additional, policy)
        .iter()
        .map(Contributor::to_string)
        .collect()
}

pub fn merge_contributors(
    commit_contributors: &IndexMap<String, u64>,
    roster_names: &IndexSet<String>,
    additional: &IndexSet<String>,
    policy: &MergePolicy,
) -> Vec<Contributor> {
    let aliases = &policy.aliases;

    let mut derived: IndexMap<String, Option<u64>> = IndexMap::new();
    for (name, count) in commit_contributors {
        let slot = derived
            .entry(aliases.canonical(name).to_string())
            .or_insert(Some(0));
        *slot = Some(slot.unwrap_or(0) + count);
    }
    for name in roster_names {
        derived
            .entry(aliases.canonical(name).to_string())
            .or_insert(None);
    }
    policy.blacklist.retain_allowed(&mut derived);

    let mut contributors: Vec<Contributor> = derived
        .iter()
        .map(|(name, commits)| Contributor {
            name: name.clone(),
            commits: *commits,
        })
        .collect();

    let mut seen: HashSet<String> = match policy.additional_match {
        AdditionalMatch::Exact => contributors.iter().map(Contributor::to_string).collect(),
        AdditionalMatch::Canonical => derived.keys().cloned().collect(),
    };
    for name in additional {
        let name = match policy.additional_match {
            AdditionalMatch::Exact => name.as_str(),
            AdditionalMatch::Canonical => aliases.canonical(name),
        };
        if policy.blacklist.contains(name) || !seen.insert(name.to_string()) {
            debug!(name, "Additional author already present or blacklisted");
            continue;
        }
        contributors.push(Contributor {
            name: name.to_string(),
            commits: None,
        });
    }

    contributors.sort_by_cached_key(|c| (title_case(last_name(&c.name)), title_case(&c.name)));
    contributors
}

/// Final whitespace-delimited token of a full name.
pub fn last_name(full_name: &str) -> &str {
    full_name.split_whitespace().last().unwrap_or(full_name)
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
