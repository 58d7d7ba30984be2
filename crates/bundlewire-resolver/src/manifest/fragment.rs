use bundlewire_version::VersionRange;

use crate::error::ParseError;
use super::header::parse_header;
use super::{ExtensionKind, BUNDLE_VERSION_ATTRIBUTE, EXTENSION_DIRECTIVE};

/// The `Fragment-Host` header of a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDescription {
    host_symbolic_name: String,
    host_version_range: VersionRange,
    extension: Option<ExtensionKind>,
}

impl FragmentDescription {
    pub fn new(host_symbolic_name: impl Into<String>, host_version_range: VersionRange) -> Self {
        Self {
            host_symbolic_name: host_symbolic_name.into(),
            host_version_range,
            extension: None,
        }
    }

    pub fn parse(header: &str) -> Result<Self, ParseError> {
        let invalid = |reason: &str| ParseError::InvalidHeader {
            header: "Fragment-Host".to_string(),
            reason: reason.to_string(),
        };

        let clauses = parse_header("Fragment-Host", header)?;
        let clause = match clauses.as_slice() {
            [clause] => clause,
            [] => return Err(invalid("no host named")),
            _ => return Err(invalid("a fragment has exactly one host")),
        };
        if clause.paths.len() != 1 {
            return Err(invalid("a fragment has exactly one host"));
        }

        Ok(Self {
            host_symbolic_name: clause.paths[0].clone(),
            host_version_range: clause
                .parameters
                .attribute(BUNDLE_VERSION_ATTRIBUTE)
                .map(VersionRange::parse)
                .transpose()?
                .unwrap_or_default(),
            extension: clause
                .parameters
                .directive(EXTENSION_DIRECTIVE)
                .map(ExtensionKind::parse)
                .transpose()?,
        })
    }

    pub fn with_extension(mut self, extension: ExtensionKind) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn host_symbolic_name(&self) -> &str {
        &self.host_symbolic_name
    }

    pub fn host_version_range(&self) -> &VersionRange {
        &self.host_version_range
    }

    pub fn extension(&self) -> Option<ExtensionKind> {
        self.extension
    }
}
