//! Version intervals

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionError};

/// An interval of versions.
///
/// `high == None` means the range is unbounded above. A bare version such as
/// `1.2` parses as `[1.2.0, ∞)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    low: Version,
    high: Option<Version>,
    low_inclusive: bool,
    high_inclusive: bool,
}

impl Default for VersionRange {
    /// `[0.0.0, ∞)`, used whenever a requirement omits a version constraint
    fn default() -> Self {
        VersionRange::at_least(Version::zero())
    }
}

impl VersionRange {
    /// Create a bounded range, rejecting `low > high`
    pub fn new(
        low: Version,
        low_inclusive: bool,
        high: Option<Version>,
        high_inclusive: bool,
    ) -> Result<Self, VersionError> {
        if let Some(high) = &high {
            if low > *high {
                return Err(VersionError::InvertedRange(format!(
                    "{}{},{}{}",
                    if low_inclusive { '[' } else { '(' },
                    low,
                    high,
                    if high_inclusive { ']' } else { ')' },
                )));
            }
        }
        Ok(VersionRange {
            low,
            high,
            low_inclusive,
            high_inclusive,
        })
    }

    /// `[low, ∞)`
    pub fn at_least(low: Version) -> Self {
        VersionRange {
            low,
            high: None,
            low_inclusive: true,
            high_inclusive: false,
        }
    }

    /// `[version, version]`
    pub fn exact(version: Version) -> Self {
        VersionRange {
            low: version.clone(),
            high: Some(version),
            low_inclusive: true,
            high_inclusive: true,
        }
    }

    /// Parse `[1.0,2.0)`, `(1,2]` or a bare version
    pub fn parse(range: &str) -> Result<Self, VersionError> {
        let trimmed = range.trim();
        let invalid = |reason: &str| VersionError::InvalidRange {
            range: range.to_string(),
            reason: reason.to_string(),
        };

        let low_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            Some(_) => return Ok(VersionRange::at_least(Version::parse(trimmed)?)),
            None => return Err(invalid("empty range")),
        };

        let high_inclusive = match trimmed.chars().last() {
            Some(']') if trimmed.len() > 1 => true,
            Some(')') if trimmed.len() > 1 => false,
            _ => return Err(invalid("missing closing bracket")),
        };

        let body = &trimmed[1..trimmed.len() - 1];
        let (low, high) = body
            .split_once(',')
            .ok_or_else(|| invalid("expected two comma separated bounds"))?;
        if high.contains(',') {
            return Err(invalid("too many bounds"));
        }

        VersionRange::new(
            Version::parse(low)?,
            low_inclusive,
            Some(Version::parse(high)?),
            high_inclusive,
        )
        .map_err(|_| VersionError::InvertedRange(range.to_string()))
    }

    /// Check whether `version` lies inside this interval
    pub fn includes(&self, version: &Version) -> bool {
        let above_low = *version > self.low || (*version == self.low && self.low_inclusive);
        let below_high = match &self.high {
            None => true,
            Some(high) => *version < *high || (*version == *high && self.high_inclusive),
        };
        above_low && below_high
    }

    /// True when no version can satisfy the range, e.g. `[1.0,1.0)`
    pub fn is_empty(&self) -> bool {
        match &self.high {
            Some(high) => self.low == *high && !(self.low_inclusive && self.high_inclusive),
            None => false,
        }
    }

    pub fn low(&self) -> &Version {
        &self.low
    }

    pub fn high(&self) -> Option<&Version> {
        self.high.as_ref()
    }

    pub fn is_low_inclusive(&self) -> bool {
        self.low_inclusive
    }

    pub fn is_high_inclusive(&self) -> bool {
        self.high_inclusive
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.high {
            None if self.low_inclusive => write!(f, "{}", self.low),
            None => write!(f, "({},∞)", self.low),
            Some(high) => write!(
                f,
                "{}{},{}{}",
                if self.low_inclusive { '[' } else { '(' },
                self.low,
                high,
                if self.high_inclusive { ']' } else { ')' },
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        VersionRange::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}
