//! Job result severities, ordered from best to worst.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownSeverity;

/// Outcome of a completed job.
///
/// The derived `Ord` follows declaration order, so `Success < Unstable <
/// Failure < NotBuilt < Aborted`. Threshold comparisons rely on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultSeverity {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl ResultSeverity {
    /// All severities in ordinal order.
    pub const ALL: [ResultSeverity; 5] = [
        ResultSeverity::Success,
        ResultSeverity::Unstable,
        ResultSeverity::Failure,
        ResultSeverity::NotBuilt,
        ResultSeverity::Aborted,
    ];

    /// Threshold used when the configured name is missing or unrecognised.
    pub const DEFAULT_THRESHOLD: ResultSeverity = ResultSeverity::Failure;

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSeverity::Success => "SUCCESS",
            ResultSeverity::Unstable => "UNSTABLE",
            ResultSeverity::Failure => "FAILURE",
            ResultSeverity::NotBuilt => "NOT_BUILT",
            ResultSeverity::Aborted => "ABORTED",
        }
    }

    /// Parse a stored threshold name, falling back to [`Self::DEFAULT_THRESHOLD`].
    pub fn parse_lenient(name: Option<&str>) -> ResultSeverity {
        name.and_then(|n| n.parse().ok())
            .unwrap_or(Self::DEFAULT_THRESHOLD)
    }

    /// Strictly less severe than `other`.
    pub fn is_better_than(&self, other: ResultSeverity) -> bool {
        *self < other
    }

    /// As severe as `other`, or more.
    pub fn is_worse_or_equal(&self, other: ResultSeverity) -> bool {
        !self.is_better_than(other)
    }

    /// Threshold options for an admin form, worst first.
    pub fn threshold_choices() -> Vec<&'static str> {
        Self::ALL.iter().rev().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for ResultSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultSeverity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}
