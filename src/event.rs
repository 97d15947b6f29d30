//! This module defines how the analysis sees collision event records
//!
//! An event record is a flat bag of named branches, each of which holds
//! either one number per event (trigger decisions, multiplicities) or an
//! array with one number per object slot (kinematics, identification).

use crate::{errors::EventError, numeric::Float};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

/// View of a single branch of an event
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BranchRef<'event> {
    /// One value for the whole event
    Scalar(Float),

    /// One value per object slot
    Array(&'event [Float]),
}

/// Interface to an event record provider
pub trait EventRecord {
    /// Truth that a branch is part of this record's schema
    fn has_branch(&self, name: &str) -> bool;

    /// Access a branch, if it exists
    fn branch(&self, name: &str) -> Option<BranchRef<'_>>;

    /// Names of all branches of this record
    fn branch_names(&self) -> Vec<String>;

    /// Build the error reported when a required branch is missing
    fn branch_not_found(&self, name: &str) -> EventError {
        EventError::BranchNotFound {
            branch: name.to_owned(),
            available: self.branch_names(),
        }
    }

    /// Access a per-event value
    fn scalar(&self, name: &str) -> Result<Float, EventError> {
        match self.branch(name) {
            Some(BranchRef::Scalar(value)) => Ok(value),
            Some(BranchRef::Array(_)) => Err(EventError::WrongBranchShape {
                branch: name.to_owned(),
                expected: "a single value",
            }),
            None => Err(self.branch_not_found(name)),
        }
    }

    /// Access a per-object array
    fn array(&self, name: &str) -> Result<&[Float], EventError> {
        match self.branch(name) {
            Some(BranchRef::Array(values)) => Ok(values),
            Some(BranchRef::Scalar(_)) => Err(EventError::WrongBranchShape {
                branch: name.to_owned(),
                expected: "an array",
            }),
            None => Err(self.branch_not_found(name)),
        }
    }

    /// Value of a branch for an object slot (scalars apply to every slot)
    fn value_at(&self, name: &str, index: usize) -> Result<Float, EventError> {
        match self.branch(name) {
            Some(BranchRef::Scalar(value)) => Ok(value),
            Some(BranchRef::Array(values)) => {
                values
                    .get(index)
                    .copied()
                    .ok_or_else(|| EventError::SlotOutOfRange {
                        branch: name.to_owned(),
                        len: values.len(),
                        index,
                    })
            }
            None => Err(self.branch_not_found(name)),
        }
    }
}

/// Owned storage for a branch
#[derive(Clone, Debug, PartialEq)]
pub enum Branch {
    /// One value for the whole event
    Scalar(Float),

    /// One value per object slot
    Array(Vec<Float>),
}

/// Event record stored as a map of branches
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapEvent {
    branches: BTreeMap<String, Branch>,
}
//
impl MapEvent {
    /// Build an empty event
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a per-event value
    pub fn with_scalar(mut self, name: &str, value: Float) -> Self {
        self.branches.insert(name.to_owned(), Branch::Scalar(value));
        self
    }

    /// Add or replace a per-object array
    pub fn with_array(mut self, name: &str, values: Vec<Float>) -> Self {
        self.branches.insert(name.to_owned(), Branch::Array(values));
        self
    }
}
//
impl EventRecord for MapEvent {
    fn has_branch(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    fn branch(&self, name: &str) -> Option<BranchRef<'_>> {
        self.branches.get(name).map(|branch| match branch {
            Branch::Scalar(value) => BranchRef::Scalar(*value),
            Branch::Array(values) => BranchRef::Array(&values[..]),
        })
    }

    fn branch_names(&self) -> Vec<String> {
        self.branches.keys().cloned().collect()
    }
}

/// JSON value of a branch, as found in the input
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBranch {
    Number(Float),
    Flag(bool),
    List(Vec<RawEntry>),
}

/// JSON value of an array entry
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Number(Float),
    Flag(bool),
}
//
impl RawEntry {
    fn value(self) -> Float {
        match self {
            RawEntry::Number(value) => value,
            RawEntry::Flag(flag) => Float::from(u8::from(flag)),
        }
    }
}
//
impl From<RawBranch> for Branch {
    fn from(raw: RawBranch) -> Self {
        match raw {
            RawBranch::Number(value) => Branch::Scalar(value),
            RawBranch::Flag(flag) => Branch::Scalar(RawEntry::Flag(flag).value()),
            RawBranch::List(entries) => {
                Branch::Array(entries.into_iter().map(RawEntry::value).collect())
            }
        }
    }
}

/// Decode one JSON object into an event record
pub fn parse_json_event(text: &str) -> Result<MapEvent, serde_json::Error> {
    let raw = serde_json::from_str::<BTreeMap<String, RawBranch>>(text)?;
    Ok(MapEvent {
        branches: raw
            .into_iter()
            .map(|(name, branch)| (name, Branch::from(branch)))
            .collect(),
    })
}

/// Sequential reader of a JSON-lines event file (one event per line)
pub struct JsonLinesReader {
    /// File being read, for error reporting
    path: PathBuf,

    /// Remaining lines of the file
    lines: Lines<BufReader<File>>,

    /// Number of lines consumed so far
    line_number: usize,
}
//
impl JsonLinesReader {
    /// Open an event file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref().to_owned();
        let file = File::open(&path).map_err(|source| EventError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    /// File being read
    pub fn path(&self) -> &Path {
        &self.path
    }
}
//
impl Iterator for JsonLinesReader {
    type Item = Result<MapEvent, EventError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(EventError::Io {
                        path: self.path.clone(),
                        source,
                    }))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(parse_json_event(&line).map_err(|source| EventError::Malformed {
                path: self.path.clone(),
                line: self.line_number,
                source,
            }));
        }
    }
}
