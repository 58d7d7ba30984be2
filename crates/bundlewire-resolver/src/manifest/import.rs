use std::collections::HashSet;

use indexmap::IndexSet;

use bundlewire_version::VersionRange;

use crate::error::ParseError;
use super::header::{parse_header, Clause};
use super::parameters::Parameters;
use super::{
    package_version, Resolution, BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE,
    RESOLUTION_DIRECTIVE,
};

/// One `Import-Package` (or `DynamicImport-Package`) clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescription {
    package_names: IndexSet<String>,
    version_range: VersionRange,
    bundle_symbolic_name: Option<String>,
    bundle_version_range: Option<VersionRange>,
    resolution: Resolution,
    parameters: Parameters,
}

impl ImportDescription {
    pub fn new<I, S>(package_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            package_names: package_names.into_iter().map(Into::into).collect(),
            version_range: VersionRange::default(),
            bundle_symbolic_name: None,
            bundle_version_range: None,
            resolution: Resolution::Mandatory,
            parameters: Parameters::default(),
        }
    }

    /// Parse an `Import-Package` header value.
    ///
    /// A package may only be imported once per module.
    pub fn parse(header: &str) -> Result<Vec<Self>, ParseError> {
        let imports = parse_header("Import-Package", header)?
            .iter()
            .map(Self::from_clause)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for import in &imports {
            for package in import.package_names() {
                if !seen.insert(package) {
                    return Err(ParseError::DuplicateImport(package.to_string()));
                }
            }
        }
        Ok(imports)
    }

    /// Parse a `DynamicImport-Package` header value; package names may be wildcards
    pub fn parse_dynamic(header: &str) -> Result<Vec<Self>, ParseError> {
        parse_header("DynamicImport-Package", header)?
            .iter()
            .map(Self::from_clause)
            .collect()
    }

    pub fn from_clause(clause: &Clause) -> Result<Self, ParseError> {
        let first = &clause.paths[0];
        let version_range = match package_version(first, &clause.parameters)? {
            Some(raw) => VersionRange::parse(raw)?,
            None => VersionRange::default(),
        };
        let bundle_version_range = clause
            .parameters
            .attribute(BUNDLE_VERSION_ATTRIBUTE)
            .map(VersionRange::parse)
            .transpose()?;

        Ok(Self {
            package_names: clause.paths.iter().cloned().collect(),
            version_range,
            bundle_symbolic_name: clause
                .parameters
                .attribute(BUNDLE_SYMBOLIC_NAME_ATTRIBUTE)
                .map(str::to_string),
            bundle_version_range,
            resolution: Resolution::from_directive(clause.parameters.directive(RESOLUTION_DIRECTIVE))?,
            parameters: clause.parameters.clone(),
        })
    }

    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }

    pub fn with_bundle(mut self, symbolic_name: &str, range: Option<VersionRange>) -> Self {
        self.bundle_symbolic_name = Some(symbolic_name.to_string());
        self.bundle_version_range = range;
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.parameters = self.parameters.with_attribute(key, value);
        self
    }

    pub fn optional(mut self) -> Self {
        self.resolution = Resolution::Optional;
        self
    }

    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.package_names.iter().map(String::as_str)
    }

    pub fn version_range(&self) -> &VersionRange {
        &self.version_range
    }

    pub fn bundle_symbolic_name(&self) -> Option<&str> {
        self.bundle_symbolic_name.as_deref()
    }

    pub fn bundle_version_range(&self) -> Option<&VersionRange> {
        self.bundle_version_range.as_ref()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_optional(&self) -> bool {
        self.resolution == Resolution::Optional
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}
