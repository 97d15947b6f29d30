//! Selection levels and the loader of the tabular selection files
//!
//! A selection file is a markdown-style table with one cut per row:
//!
//! ```text
//! | selLvl | parentLvl | branchName | Value | Operator |
//! | :----: | :-------: | :--------: | :---: | :------: |
//! | all | None | mu_ibt_pt | 0 | ge |
//! | kin | all | mu_ibt_pt | 53 | ge |
//! | kin | all | mu_ibt_eta | 2.4 | fabs-le |
//! ```
//!
//! The first time a level appears with a parent, it starts out as a copy of
//! that parent's cuts. Levels which never appear are filled in after the
//! whole file has been read, according to a `FillPolicy`.

use crate::{
    cut::{Cut, CutOperator},
    errors::{ConfigError, Location, OptionalLocation},
    numeric::Float,
};
use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    str::FromStr,
};

/// Cuts of one selection level, keyed by the name of the branch they apply to
pub type CutSet = BTreeMap<String, Cut>;

/// Number of selection levels
pub const NUM_LEVELS: usize = 4;

/// Names of the selection levels, from loosest to tightest
pub const LEVEL_NAMES: &[&str] = &["all", "kin", "kin-id", "kin-id-iso"];

/// Parent level name meaning "start from an empty cut set"
const NO_PARENT: &str = "none";

/// Number of header lines at the top of a selection file
const HEADER_LINES: usize = 2;

/// Number of columns of a selection file row
const NUM_COLUMNS: usize = 5;

/// Progressive selection stages, from loosest to tightest
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectionLevel {
    /// No requirement beyond the loosest cuts
    All,
    /// Kinematic requirements
    Kin,
    /// Kinematic and identification requirements
    KinId,
    /// Kinematic, identification and isolation requirements
    KinIdIso,
}
//
impl SelectionLevel {
    /// Every level, in chain order
    pub const ALL: [SelectionLevel; NUM_LEVELS] = [
        SelectionLevel::All,
        SelectionLevel::Kin,
        SelectionLevel::KinId,
        SelectionLevel::KinIdIso,
    ];

    /// The most restrictive level, on which the resonance is built
    pub const FINAL: SelectionLevel = SelectionLevel::KinIdIso;

    /// Position of this level in the chain
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name of this level in selection files and outputs
    pub fn name(self) -> &'static str {
        LEVEL_NAMES[self.index()]
    }

    /// Level which precedes this one in the chain
    pub fn predecessor(self) -> Option<Self> {
        self.index().checked_sub(1).map(|idx| Self::ALL[idx])
    }
}
//
impl FromStr for SelectionLevel {
    type Err = ();

    /// Case-insensitive level lookup
    fn from_str(name: &str) -> Result<Self, ()> {
        let name = name.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.name() == name)
            .ok_or(())
    }
}
//
impl std::fmt::Display for SelectionLevel {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(self.name())
    }
}

/// How levels that a selection file does not mention get their cuts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillPolicy {
    /// Copy the last level that the file declared, whatever its position in
    /// the chain. This is what historical selection files were written for.
    #[default]
    LastSeen,

    /// Copy the closest preceding level of the chain (empty if none)
    NearestAncestor,
}

/// Fully resolved cuts of every selection level for one particle species
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionTable {
    levels: [CutSet; NUM_LEVELS],
}
//
impl SelectionTable {
    /// Table which lets every object through at every level
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Load a selection table from a file
    pub fn load(path: impl AsRef<Path>, policy: FillPolicy) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::UnreadableTable {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path, policy)
    }

    /// Parse the contents of a selection file (path is used for reporting)
    pub fn parse(text: &str, path: &Path, policy: FillPolicy) -> Result<Self, ConfigError> {
        let mut declared: BTreeMap<SelectionLevel, CutSet> = BTreeMap::new();
        let mut declaration_order = Vec::with_capacity(NUM_LEVELS);

        for (idx, raw_line) in text.lines().enumerate().skip(HEADER_LINES) {
            if raw_line.starts_with('#') {
                continue;
            }
            let location = Location {
                path: path.to_owned(),
                line: idx + 1,
            };
            let row = match TableRow::parse(raw_line, &location)? {
                Some(row) => row,
                None => continue,
            };

            match row.parent {
                Some(parent) if !declared.contains_key(&row.level) => {
                    let inherited = declared.get(&parent).cloned().ok_or_else(|| {
                        ConfigError::UndeclaredParentLevel {
                            location: location.clone(),
                            parent: parent.name().to_owned(),
                            declared: declared.keys().map(|level| level.name()).collect(),
                        }
                    })?;
                    declared.insert(row.level, inherited);
                    declaration_order.push(row.level);
                }
                _ => {
                    if !declared.contains_key(&row.level) {
                        declared.insert(row.level, CutSet::new());
                        declaration_order.push(row.level);
                    }
                }
            }
            if let Some(cuts) = declared.get_mut(&row.level) {
                cuts.insert(row.branch, row.cut);
            }
        }

        Self::fill(declared, &declaration_order, path, policy)
    }

    /// Resolve the levels which the file did not declare
    fn fill(
        mut declared: BTreeMap<SelectionLevel, CutSet>,
        declaration_order: &[SelectionLevel],
        path: &Path,
        policy: FillPolicy,
    ) -> Result<Self, ConfigError> {
        let mut levels: [CutSet; NUM_LEVELS] = Default::default();
        match policy {
            FillPolicy::LastSeen => {
                let last = *declaration_order
                    .last()
                    .ok_or_else(|| ConfigError::EmptySelectionTable {
                        path: path.to_owned(),
                    })?;
                let last_cuts = declared.get(&last).cloned().unwrap_or_default();
                for level in SelectionLevel::ALL {
                    levels[level.index()] =
                        declared.remove(&level).unwrap_or_else(|| last_cuts.clone());
                }
            }
            FillPolicy::NearestAncestor => {
                for level in SelectionLevel::ALL {
                    let cuts = match declared.remove(&level) {
                        Some(cuts) => cuts,
                        None => level
                            .predecessor()
                            .map(|pred| levels[pred.index()].clone())
                            .unwrap_or_default(),
                    };
                    levels[level.index()] = cuts;
                }
            }
        }
        Ok(Self { levels })
    }

    /// Cuts of a selection level
    pub fn cuts(&self, level: SelectionLevel) -> &CutSet {
        &self.levels[level.index()]
    }

    /// Iterate over all levels and their cuts, in chain order
    pub fn iter(&self) -> impl Iterator<Item = (SelectionLevel, &CutSet)> {
        SelectionLevel::ALL.into_iter().zip(self.levels.iter())
    }
}

/// One decoded row of a selection file
struct TableRow {
    level: SelectionLevel,
    parent: Option<SelectionLevel>,
    branch: String,
    cut: Cut,
}
//
impl TableRow {
    /// Decode a row, or return None for a blank line
    fn parse(raw_line: &str, location: &Location) -> Result<Option<Self>, ConfigError> {
        let line = raw_line
            .chars()
            .filter(|c| !matches!(c, ' ' | '\t' | '\r'))
            .collect::<String>();
        if line.is_empty() {
            return Ok(None);
        }

        // Outer delimiters are optional
        let line = line.strip_prefix('|').unwrap_or(&line);
        let line = line.strip_suffix('|').unwrap_or(line);
        let columns = line.split('|').collect::<Vec<_>>();
        if columns.len() != NUM_COLUMNS {
            return Err(ConfigError::MalformedRow {
                location: location.clone(),
                expected: NUM_COLUMNS,
                found: columns.len(),
                row: raw_line.to_owned(),
            });
        }
        let (level, parent, branch, value, operator) =
            (columns[0], columns[1], columns[2], columns[3], columns[4]);

        let level = level
            .parse::<SelectionLevel>()
            .map_err(|()| ConfigError::UnknownSelectionLevel {
                location: location.clone(),
                level: level.to_lowercase(),
                valid: LEVEL_NAMES,
            })?;

        let parent = if parent.eq_ignore_ascii_case(NO_PARENT) {
            None
        } else {
            Some(
                parent
                    .parse::<SelectionLevel>()
                    .map_err(|()| ConfigError::UnknownParentLevel {
                        location: location.clone(),
                        parent: parent.to_lowercase(),
                        valid: LEVEL_NAMES,
                    })?,
            )
        };

        let operator_location = OptionalLocation(Some(location.clone()));
        let operator = CutOperator::parse(operator, &operator_location)?;

        let threshold = value
            .parse::<Float>()
            .map_err(|_| ConfigError::InvalidThreshold {
                location: location.clone(),
                value: value.to_owned(),
            })?;

        Ok(Some(Self {
            level,
            parent,
            branch: branch.to_owned(),
            cut: Cut::new(threshold, operator),
        }))
    }
}
