//! Version parsing and ordering

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for version and range parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string \"{0}\"")]
    InvalidVersion(String),
    #[error("Invalid version range \"{range}\": {reason}")]
    InvalidRange { range: String, reason: String },
    #[error("Version range \"{0}\" has a lower bound above its upper bound")]
    InvertedRange(String),
}

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(
        r"^(\d+)(?:\.(\d+)(?:\.(\d+)(?:\.([A-Za-z0-9_-]+))?)?)?$"
    ).unwrap();
}

/// A `major.minor.micro.qualifier` version.
///
/// Numeric components compare numerically, the qualifier compares as a
/// plain string and an empty qualifier sorts before any other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: u64,
    micro: u64,
    qualifier: String,
}

impl Version {
    /// Create a version without a qualifier
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Version {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Create a version carrying a qualifier
    pub fn with_qualifier(major: u64, minor: u64, micro: u64, qualifier: impl Into<String>) -> Self {
        Version {
            major,
            minor,
            micro,
            qualifier: qualifier.into(),
        }
    }

    /// The `0.0.0` version
    pub fn zero() -> Self {
        Version::default()
    }

    /// Parse a version string such as `1`, `1.2`, `1.2.3` or `1.2.3.qualifier`
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let trimmed = version.trim();
        let caps = VERSION_RE
            .captures(trimmed)
            .ok_or_else(|| VersionError::InvalidVersion(version.to_string()))?;

        let number = |idx: usize| -> Result<u64, VersionError> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| VersionError::InvalidVersion(version.to_string())),
                None => Ok(0),
            }
        };

        Ok(Version {
            major: number(1)?,
            minor: number(2)?,
            micro: number(3)?,
            qualifier: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn micro(&self) -> u64 {
        self.micro
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}
