//! Mechanism to apply a single numerical cut to a candidate value
//!
//! Cuts are written in selection tables as an operator specification such as
//! `ge` or `fabs-le`: up to two tokens separated by `-`, out of which exactly
//! one must be a relational operator. Specifications are validated once when
//! the table is loaded, after which evaluating a cut cannot fail.

use crate::{
    errors::{ConfigError, OptionalLocation},
    numeric::Float,
};
use prefix_num_ops::real::abs;

/// Every operator token which may appear in an operator specification
pub const SUPPORTED_OPERATORS: &[&str] = &["eq", "fabs", "g", "ge", "l", "le"];

/// Separator between the tokens of an operator specification
pub const OPERATOR_DELIMITER: char = '-';

/// Maximal number of tokens in an operator specification
const MAX_TOKENS: usize = 2;

/// Relational part of a cut
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    /// `eq`
    Equal,
    /// `g`
    Greater,
    /// `ge`
    GreaterOrEqual,
    /// `l`
    Less,
    /// `le`
    LessOrEqual,
}
//
impl Relation {
    /// Compare a value against a threshold
    pub fn holds(self, value: Float, threshold: Float) -> bool {
        match self {
            Relation::Equal => value == threshold,
            Relation::Greater => value > threshold,
            Relation::GreaterOrEqual => value >= threshold,
            Relation::Less => value < threshold,
            Relation::LessOrEqual => value <= threshold,
        }
    }

    /// Token which spells this relation in a selection table
    pub fn token(self) -> &'static str {
        match self {
            Relation::Equal => "eq",
            Relation::Greater => "g",
            Relation::GreaterOrEqual => "ge",
            Relation::Less => "l",
            Relation::LessOrEqual => "le",
        }
    }
}

/// One token of an operator specification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorToken {
    /// `fabs`: take the absolute value before comparing
    Absolute,
    /// Any relational operator
    Relation(Relation),
}
//
impl OperatorToken {
    /// Decode a token, rejecting anything outside of SUPPORTED_OPERATORS
    pub fn parse(token: &str, location: &OptionalLocation) -> Result<Self, ConfigError> {
        Ok(match token {
            "fabs" => OperatorToken::Absolute,
            "eq" => OperatorToken::Relation(Relation::Equal),
            "g" => OperatorToken::Relation(Relation::Greater),
            "ge" => OperatorToken::Relation(Relation::GreaterOrEqual),
            "l" => OperatorToken::Relation(Relation::Less),
            "le" => OperatorToken::Relation(Relation::LessOrEqual),
            _ => {
                return Err(ConfigError::UnknownOperator {
                    location: location.clone(),
                    token: token.to_owned(),
                    valid: SUPPORTED_OPERATORS,
                })
            }
        })
    }
}

/// Validated operator specification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CutOperator {
    /// Whether the magnitude of the value is compared instead of the value
    pub absolute: bool,

    /// Comparison against the threshold
    pub relation: Relation,
}
//
impl CutOperator {
    /// Parse an operator specification such as `fabs-le`
    pub fn parse(spec: &str, location: &OptionalLocation) -> Result<Self, ConfigError> {
        let tokens = spec.split(OPERATOR_DELIMITER).collect::<Vec<_>>();
        Self::from_tokens(&tokens, location)
    }

    /// Build an operator from a list of tokens
    pub fn from_tokens(tokens: &[&str], location: &OptionalLocation) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidOperatorSpec {
            location: location.clone(),
            tokens: tokens.iter().map(|&t| t.to_owned()).collect(),
            reason,
        };
        if tokens.len() > MAX_TOKENS {
            return Err(invalid("at most two operator tokens may be combined"));
        }

        // Validate every token before looking at how they combine, so that a
        // typo is reported as such.
        let decoded = tokens
            .iter()
            .map(|token| OperatorToken::parse(token, location))
            .collect::<Result<Vec<_>, _>>()?;

        let mut absolute = false;
        let mut relation = None;
        for token in decoded {
            match token {
                OperatorToken::Absolute if absolute => {
                    return Err(invalid("'fabs' may only appear once"))
                }
                OperatorToken::Absolute => absolute = true,
                OperatorToken::Relation(_) if relation.is_some() => {
                    return Err(invalid("only one relational operator may be applied"))
                }
                OperatorToken::Relation(rel) => relation = Some(rel),
            }
        }
        let relation = relation.ok_or_else(|| invalid("a relational operator is required"))?;
        Ok(Self { absolute, relation })
    }

    /// Decide whether a value passes a cut with this operator
    pub fn passes(&self, value: Float, threshold: Float) -> bool {
        let value = if self.absolute { abs(value) } else { value };
        self.relation.holds(value, threshold)
    }
}
//
impl std::fmt::Display for CutOperator {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.absolute {
            write!(fmt, "fabs{OPERATOR_DELIMITER}")?;
        }
        write!(fmt, "{}", self.relation.token())
    }
}

/// A threshold together with the way values are compared to it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cut {
    /// Value to compare against
    pub threshold: Float,

    /// How to compare
    pub operator: CutOperator,
}
//
impl Cut {
    /// Setup a cut
    pub fn new(threshold: Float, operator: CutOperator) -> Self {
        Self {
            threshold,
            operator,
        }
    }

    /// Decide whether a value passes this cut
    pub fn passes(&self, value: Float) -> bool {
        self.operator.passes(value, self.threshold)
    }
}

/// Evaluate a cut straight from its operator tokens
///
/// Prefer validating a `CutOperator` once and reusing it; this entry point
/// re-validates the tokens on every call.
///
pub fn passes(value: Float, threshold: Float, operators: &[&str]) -> Result<bool, ConfigError> {
    CutOperator::from_tokens(operators, &OptionalLocation::default())
        .map(|operator| operator.passes(value, threshold))
}
