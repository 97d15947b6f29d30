//! Error taxonomy of the analysis
//!
//! Every error in here is fatal: configuration mistakes, schema mismatches
//! and unreadable inputs all abort the run. Nothing that can happen to a
//! single well-formed event is an error.

use std::path::PathBuf;
use thiserror::Error;

/// Mistakes in the analysis configuration (selection tables, operators,
/// daughter pairing)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A selection level that is not part of the level chain
    #[error("{location}: selection level '{level}' is not supported, valid levels are {valid:?}")]
    UnknownSelectionLevel {
        /// Where the row comes from
        location: Location,
        /// Offending level name
        level: String,
        /// Accepted names
        valid: &'static [&'static str],
    },

    /// A parent level that is neither part of the chain nor "none"
    #[error("{location}: parent level '{parent}' is not supported, valid parents are \"none\" and {valid:?}")]
    UnknownParentLevel {
        /// Where the row comes from
        location: Location,
        /// Offending parent name
        parent: String,
        /// Accepted names
        valid: &'static [&'static str],
    },

    /// A parent level that exists, but had not been declared yet
    #[error("{location}: parent level '{parent}' has not been declared yet, declared levels are {declared:?}")]
    UndeclaredParentLevel {
        /// Where the row comes from
        location: Location,
        /// Offending parent name
        parent: String,
        /// Levels declared so far
        declared: Vec<&'static str>,
    },

    /// An operator token outside of the supported set
    #[error("{location}operator '{token}' is not supported, valid operators are {valid:?}")]
    UnknownOperator {
        /// Where the operator comes from, if from a file
        location: OptionalLocation,
        /// Offending token
        token: String,
        /// Accepted names
        valid: &'static [&'static str],
    },

    /// A combination of operator tokens that does not form one comparison
    #[error("{location}operator specification {tokens:?} is invalid: {reason}")]
    InvalidOperatorSpec {
        /// Where the operator comes from, if from a file
        location: OptionalLocation,
        /// Tokens of the specification
        tokens: Vec<String>,
        /// What is wrong with them
        reason: &'static str,
    },

    /// A table row that does not have the expected number of columns
    #[error("{location}: expected {expected} columns, found {found} in '{row}'")]
    MalformedRow {
        /// Where the row comes from
        location: Location,
        /// Number of columns of a row
        expected: usize,
        /// Number of columns found
        found: usize,
        /// Raw row
        row: String,
    },

    /// A cut threshold that is not a number
    #[error("{location}: threshold '{value}' is not a number")]
    InvalidThreshold {
        /// Where the row comes from
        location: Location,
        /// Offending threshold
        value: String,
    },

    /// A selection table that did not declare any level
    #[error("selection table {} does not declare any selection level", path.display())]
    EmptySelectionTable {
        /// File in question
        path: PathBuf,
    },

    /// A selection table that could not be read
    #[error("failed to read selection table {}", path.display())]
    UnreadableTable {
        /// File in question
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A resonance daughter pairing that the analysis does not handle
    #[error(
        "daughter PDG id pairing ({first}, {second}) is not supported, allowed pairings are \
         (11, 13), (11, 15), (15, 13) or their permutations"
    )]
    UnsupportedDaughterPair {
        /// First PDG id
        first: i32,
        /// Second PDG id
        second: i32,
    },
}

/// Problems with the event input (schema mismatches and unreadable data)
#[derive(Debug, Error)]
pub enum EventError {
    /// A branch required by the configuration is absent from the event
    #[error("branch '{branch}' not found in the event record, available branches are {available:?}")]
    BranchNotFound {
        /// Name of the branch
        branch: String,
        /// Branches that the record has
        available: Vec<String>,
    },

    /// A branch exists, but an array was expected and a scalar found (or
    /// the reverse)
    #[error("branch '{branch}' has the wrong shape, expected {expected}")]
    WrongBranchShape {
        /// Name of the branch
        branch: String,
        /// Shape that was expected
        expected: &'static str,
    },

    /// A branch array is shorter than the object multiplicity claims
    #[error("branch '{branch}' has {len} entries, but slot {index} was requested")]
    SlotOutOfRange {
        /// Name of the branch
        branch: String,
        /// Number of entries of the branch
        len: usize,
        /// Requested slot
        index: usize,
    },

    /// The event input could not be opened or read
    #[error("failed to read event input {}", path.display())]
    Io {
        /// File in question
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A per-event report could not be written out
    #[error("failed to write an event report")]
    Report(#[source] std::io::Error),

    /// A line of the event input is not a valid event record
    #[error("{}:{line}: malformed event record", path.display())]
    Malformed {
        /// File in question
        path: PathBuf,
        /// Line number (1-based)
        line: usize,
        /// Underlying decoding error
        #[source]
        source: serde_json::Error,
    },
}

/// Position of a row in a configuration file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// File which the row comes from
    pub path: PathBuf,

    /// Line number (1-based)
    pub line: usize,
}
//
impl std::fmt::Display for Location {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}:{}", self.path.display(), self.line)
    }
}

/// Location which is only known when an operator comes from a file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionalLocation(pub Option<Location>);
//
impl std::fmt::Display for OptionalLocation {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(location) => write!(fmt, "{location}: "),
            None => Ok(()),
        }
    }
}
