//! Roster store: the hand-maintained contributor table.
//!
//! The roster is a delimited file with a header row. Columns are looked up by
//! name (`Name`, `Role`), so their order in the file does not matter.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, info};

use crate::contract::{parse_roles, RosterEntry, RosterSource};
use crate::error::{CreditsError, Result};

pub const NAME_COLUMN: &str = "Name";
pub const ROLE_COLUMN: &str = "Role";

/// [`RosterSource`] reading a CSV file from disk on every load.
#[derive(Debug, Clone)]
pub struct CsvRoster {
    path: PathBuf,
    delimiter: u8,
}

impl CsvRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterSource for CsvRoster {
    fn load(&self) -> Result<Vec<RosterEntry>> {
        let file = File::open(&self.path).map_err(|e| {
            error!(error = ?e, path = %self.path.display(), "Failed to open roster");
            e
        })?;
        let entries = load_roster(file, self.delimiter)?;
        info!(path = %self.path.display(), entries = entries.len(), "Loaded roster");
        Ok(entries)
    }
}

/// Reads roster rows from any delimited text source.
pub fn load_roster<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RosterEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let name_idx = column(&headers, NAME_COLUMN)?;
    column(&headers, ROLE_COLUMN)?;

    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or_default();
        if name.is_empty() {
            debug!(row = ?record.position().map(|p| p.line()), "Skipping roster row without a name");
            continue;
        }
        let fields: IndexMap<String, String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != name_idx)
            .map(|(idx, header)| {
                (
                    header.to_string(),
                    record.get(idx).unwrap_or_default().to_string(),
                )
            })
            .collect();
        let roles = parse_roles(fields.get(ROLE_COLUMN).map(String::as_str).unwrap_or_default());
        entries.push(RosterEntry {
            name: name.to_string(),
            roles,
            fields,
        });
    }
    Ok(entries)
}

fn column(headers: &csv::StringRecord, wanted: &'static str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == wanted)
        .ok_or(CreditsError::MissingColumn(wanted))
}

/// Names of entries holding `role`. An empty role selects everyone except
/// funding-only entries.
pub fn filter_by_role(entries: &[RosterEntry], role: &str) -> IndexSet<String> {
    let role = role.trim();
    entries
        .iter()
        .filter(|entry| {
            if role.is_empty() {
                !entry.is_funding_only()
            } else {
                entry.has_role(role)
            }
        })
        .map(|entry| entry.name.clone())
        .collect()
}
