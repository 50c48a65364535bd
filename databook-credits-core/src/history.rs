//! Commit-log reader: committer names and commit counts from git.
//!
//! The reader shells out to `git shortlog -sn`, whose output is one
//! `<count>\t<name>` line per committer, ordered by count. Anything that
//! prevents reading history (no git binary, not a repository, no commits) is
//! logged and degrades to an empty list so documentation builds keep going.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::contract::{CommitRecord, History};
use crate::error::{CreditsError, Result};

/// [`History`] backed by the `git` executable, run in `repo_dir`.
#[derive(Debug, Clone)]
pub struct GitHistory {
    repo_dir: PathBuf,
}

impl GitHistory {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn git(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .stdin(Stdio::null())
            .output()
    }
}

impl History for GitHistory {
    fn shortlog(&self) -> Vec<CommitRecord> {
        // An explicit revision keeps shortlog from waiting on stdin.
        let output = match self.git(&["shortlog", "-sn", "HEAD"]) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = ?e, repo = %self.repo_dir.display(), "Failed to launch git shortlog");
                return Vec::new();
            }
        };
        if !output.status.success() {
            warn!(
                repo = %self.repo_dir.display(),
                status = ?output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git shortlog failed, continuing without commit history"
            );
            return Vec::new();
        }

        let records = parse_shortlog(&String::from_utf8_lossy(&output.stdout));
        info!(
            repo = %self.repo_dir.display(),
            committers = records.len(),
            "Read committers from git history"
        );
        records
    }

    fn latest_tag(&self) -> Result<String> {
        let output = self.git(&["describe", "--tags", "--abbrev=0"]).map_err(|e| {
            warn!(error = ?e, repo = %self.repo_dir.display(), "Failed to launch git describe");
            CreditsError::UnresolvableVersionTag(e.to_string())
        })?;
        let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || tag.is_empty() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CreditsError::UnresolvableVersionTag(detail));
        }
        debug!(tag = %tag, "Resolved latest version tag");
        Ok(tag)
    }
}

fn shortlog_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| Regex::new(r"^\s*(\d+)\t(.+?)\s*$").expect("shortlog pattern is valid"))
}

/// Parses `git shortlog -sn` output into one record per distinct name, in
/// first-seen order. Blank lines are skipped; a name repeated on several
/// lines has its counts summed.
pub fn parse_shortlog(text: &str) -> Vec<CommitRecord> {
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(caps) = shortlog_line().captures(line) else {
            debug!(line, "Skipping unrecognised shortlog line");
            continue;
        };
        let Ok(count) = caps[1].parse::<u64>() else {
            debug!(line, "Skipping shortlog line with out-of-range count");
            continue;
        };
        *counts.entry(caps[2].to_string()).or_insert(0) += count;
    }
    counts
        .into_iter()
        .map(|(name, commit_count)| CommitRecord { name, commit_count })
        .collect()
}
