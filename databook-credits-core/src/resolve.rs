//! Alias and blacklist resolution of raw committer names.
//!
//! Raw names are mapped to canonical names first; records sharing a canonical
//! name have their commit counts summed. Blacklisted canonical names are
//! removed afterwards.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::CommitRecord;
use crate::error::{CreditsError, Result};

/// Separator between raw and canonical name in textual alias options.
pub const ALIAS_DELIMITER: &str = "--";

/// Mapping from raw committer name to canonical name. Names without an entry
/// map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap(IndexMap<String, String>);

impl AliasMap {
    /// Builds a map, rejecting chains where a target is itself redirected.
    /// The first occurrence of a duplicated key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = IndexMap::new();
        for (key, value) in pairs {
            map.entry(key.into()).or_insert_with(|| value.into());
        }
        let aliases = Self(map);
        aliases.validate()?;
        Ok(aliases)
    }

    /// A canonical name may only appear as a key when it maps to itself.
    pub fn validate(&self) -> Result<()> {
        for target in self.0.values() {
            if let Some(next) = self.0.get(target) {
                if next != target {
                    return Err(CreditsError::CyclicAlias(target.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Canonical names excluded from every output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blacklist(BTreeSet<String>);

impl Blacklist {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Drops blacklisted keys. Applying it again changes nothing.
    pub fn retain_allowed<V>(&self, map: &mut IndexMap<String, V>) {
        map.retain(|name, _| !self.contains(name));
    }
}

impl<S: Into<String>> FromIterator<S> for Blacklist {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Parses `raw--canonical, raw--canonical` alias options.
pub fn parse_aliases(raw: &str, delimiter: &str) -> Result<AliasMap> {
    let mut pairs = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let parts: Vec<&str> = entry.split(delimiter).map(str::trim).collect();
        match parts.as_slice() {
            [key, value] if !key.is_empty() && !value.is_empty() => pairs.push((*key, *value)),
            _ => return Err(CreditsError::MalformedAliasSpec(entry.to_string())),
        }
    }
    AliasMap::from_pairs(pairs)
}

/// Parses a comma-separated list of names, keeping first-seen order.
pub fn parse_name_set(raw: &str) -> IndexSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Maps records onto canonical names, summing counts of records that share
/// one, then removes blacklisted names.
pub fn resolve(
    records: &[CommitRecord],
    aliases: &AliasMap,
    blacklist: &Blacklist,
) -> IndexMap<String, u64> {
    let mut resolved: IndexMap<String, u64> = IndexMap::new();
    for record in records {
        let canonical = aliases.canonical(&record.name);
        if canonical != record.name {
            debug!(raw = %record.name, canonical, "Applied alias");
        }
        *resolved.entry(canonical.to_string()).or_insert(0) += record.commit_count;
    }
    blacklist.retain_allowed(&mut resolved);
    resolved
}
