//! # contract: data model and seams of the attribution pipeline
//!
//! This module defines the plain data records that flow between pipeline
//! stages and the two traits through which the pipeline reaches the outside
//! world: commit history ([`History`]) and the contributor roster
//! ([`RosterSource`]).
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so pipeline and directive tests
//!   can run against deterministic history and roster data without a git
//!   repository or CSV file on disk.
//!
//! ## Implementations
//! - [`crate::history::GitHistory`] shells out to `git`.
//! - [`crate::roster::CsvRoster`] reads a delimited file with a header row.

use std::collections::BTreeSet;

use indexmap::IndexMap;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::error::Result;

/// One distinct raw committer name and the number of commits under that exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub name: String,
    pub commit_count: u64,
}

impl CommitRecord {
    pub fn new(name: impl Into<String>, commit_count: u64) -> Self {
        Self {
            name: name.into(),
            commit_count,
        }
    }
}

/// A row of the contributor roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub name: String,
    /// Parsed from the comma-separated `Role` column.
    pub roles: BTreeSet<String>,
    /// Every column other than `Name`, in file order, including `Role`.
    pub fields: IndexMap<String, String>,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, role: &str) -> Self {
        let mut fields = IndexMap::new();
        fields.insert("Role".to_string(), role.to_string());
        Self {
            name: name.into(),
            roles: parse_roles(role),
            fields,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Funders only appear when explicitly asked for.
    pub fn is_funding_only(&self) -> bool {
        self.roles.len() == 1 && self.roles.contains("Funding")
    }
}

/// Splits a role cell into a set of roles. Blank segments are dropped.
pub fn parse_roles(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read-only view of a project's version-control history.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait History {
    /// Per-committer commit counts. An unreadable or empty history yields an
    /// empty list rather than an error.
    fn shortlog(&self) -> Vec<CommitRecord>;

    /// The most recent tag reachable from the current commit.
    fn latest_tag(&self) -> Result<String>;
}

/// Backing store for the contributor roster.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait RosterSource {
    /// Reads the full roster afresh.
    fn load(&self) -> Result<Vec<RosterEntry>>;
}
