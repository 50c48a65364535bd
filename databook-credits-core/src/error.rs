//! Error type shared by every stage of the attribution pipeline.
//!
//! Configuration problems (alias format, alias cycles, roster columns) are
//! fatal. Gaps in data availability are mostly recovered locally by the
//! stage that meets them; only the version tag lookup surfaces its absence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreditsError {
    /// An alias entry could not be split into exactly one key and one value.
    #[error(
        "Aliases should be formatted in key:value pairs, delimited by a single separator (got {0:?})"
    )]
    MalformedAliasSpec(String),

    /// An alias target is itself an alias key mapping somewhere else.
    #[error("alias target {0:?} is itself aliased to a different name")]
    CyclicAlias(String),

    #[error("directive {directive:?} does not accept option {option:?}")]
    UnknownOption { directive: String, option: String },

    #[error("directive {0:?} needs a roster but none is configured")]
    RosterUnavailable(String),

    #[error("roster is missing required column {0:?}")]
    MissingColumn(&'static str),

    #[error("failed to read roster: {0}")]
    Roster(#[from] csv::Error),

    /// No release tag is reachable from the current commit.
    #[error("there are no git tags from which to get the version number: {0}")]
    UnresolvableVersionTag(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CreditsError>;
