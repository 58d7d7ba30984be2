use bundlewire_version::VersionRange;

use crate::error::ParseError;
use super::header::{parse_header, Clause};
use super::parameters::Parameters;
use super::{Resolution, Visibility, BUNDLE_VERSION_ATTRIBUTE, RESOLUTION_DIRECTIVE, VISIBILITY_DIRECTIVE};

/// A `Require-Bundle` entry naming one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireDescription {
    symbolic_name: String,
    version_range: VersionRange,
    resolution: Resolution,
    visibility: Visibility,
    parameters: Parameters,
}

impl RequireDescription {
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            version_range: VersionRange::default(),
            resolution: Resolution::Mandatory,
            visibility: Visibility::Private,
            parameters: Parameters::default(),
        }
    }

    /// Parse a `Require-Bundle` header value. A clause naming several
    /// modules yields one description per module.
    pub fn parse(header: &str) -> Result<Vec<Self>, ParseError> {
        let mut requires = Vec::new();
        for clause in parse_header("Require-Bundle", header)? {
            requires.extend(Self::from_clause(&clause)?);
        }
        Ok(requires)
    }

    pub fn from_clause(clause: &Clause) -> Result<Vec<Self>, ParseError> {
        let version_range = clause
            .parameters
            .attribute(BUNDLE_VERSION_ATTRIBUTE)
            .map(VersionRange::parse)
            .transpose()?
            .unwrap_or_default();
        let resolution = Resolution::from_directive(clause.parameters.directive(RESOLUTION_DIRECTIVE))?;
        let visibility = Visibility::from_directive(clause.parameters.directive(VISIBILITY_DIRECTIVE))?;

        Ok(clause
            .paths
            .iter()
            .map(|name| Self {
                symbolic_name: name.clone(),
                version_range: version_range.clone(),
                resolution,
                visibility,
                parameters: clause.parameters.clone(),
            })
            .collect())
    }

    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }

    pub fn optional(mut self) -> Self {
        self.resolution = Resolution::Optional;
        self
    }

    pub fn reexport(mut self) -> Self {
        self.visibility = Visibility::Reexport;
        self
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn version_range(&self) -> &VersionRange {
        &self.version_range
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_optional(&self) -> bool {
        self.resolution == Resolution::Optional
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_reexport(&self) -> bool {
        self.visibility == Visibility::Reexport
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}
