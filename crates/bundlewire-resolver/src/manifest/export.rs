use indexmap::IndexSet;

use bundlewire_version::Version;

use crate::error::ParseError;
use super::header::{parse_header, split_list, Clause};
use super::parameters::Parameters;
use super::{
    package_version, BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE, MANDATORY_DIRECTIVE,
    USES_DIRECTIVE,
};

/// One `Export-Package` clause: packages exported together with identical
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescription {
    package_names: IndexSet<String>,
    version: Version,
    parameters: Parameters,
    uses: IndexSet<String>,
    mandatory: IndexSet<String>,
}

impl ExportDescription {
    pub fn new<I, S>(package_names: I, version: Version) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            package_names: package_names.into_iter().map(Into::into).collect(),
            version,
            parameters: Parameters::default(),
            uses: IndexSet::new(),
            mandatory: IndexSet::new(),
        }
    }

    /// Parse an `Export-Package` header value
    pub fn parse(header: &str) -> Result<Vec<Self>, ParseError> {
        parse_header("Export-Package", header)?
            .iter()
            .map(Self::from_clause)
            .collect()
    }

    pub fn from_clause(clause: &Clause) -> Result<Self, ParseError> {
        let first = &clause.paths[0];
        for reserved in [BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE] {
            if clause.parameters.attribute(reserved).is_some() {
                return Err(ParseError::ReservedAttribute {
                    package: first.clone(),
                    attribute: reserved.to_string(),
                });
            }
        }

        let version = match package_version(first, &clause.parameters)? {
            Some(raw) => Version::parse(raw)?,
            None => Version::zero(),
        };

        Ok(Self {
            package_names: clause.paths.iter().cloned().collect(),
            version,
            parameters: clause.parameters.clone(),
            uses: clause
                .parameters
                .directive(USES_DIRECTIVE)
                .map(split_list)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            mandatory: clause
                .parameters
                .directive(MANDATORY_DIRECTIVE)
                .map(split_list)
                .unwrap_or_default()
                .into_iter()
                .collect(),
        })
    }

    pub fn with_uses<I, S>(mut self, uses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uses.extend(uses.into_iter().map(Into::into));
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.parameters = self.parameters.with_attribute(key, value);
        self
    }

    /// Mark an attribute as mandatory; importers must match it explicitly
    pub fn with_mandatory(mut self, key: &str, value: &str) -> Self {
        self.parameters = self.parameters.with_attribute(key, value);
        self.mandatory.insert(key.to_string());
        self
    }

    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.package_names.iter().map(String::as_str)
    }

    pub fn exports_package(&self, package: &str) -> bool {
        self.package_names.contains(package)
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn uses(&self) -> impl Iterator<Item = &str> {
        self.uses.iter().map(String::as_str)
    }

    pub fn mandatory(&self) -> impl Iterator<Item = &str> {
        self.mandatory.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let exports = ExportDescription::parse(
            "com.acme.api;com.acme.spi;version=1.2;uses:=\"com.acme.util,org.log\";vendor=acme",
        )
        .unwrap();
        assert_eq!(exports.len(), 1);
        let export = &exports[0];
        assert_eq!(export.package_names().collect::<Vec<_>>(), vec!["com.acme.api", "com.acme.spi"]);
        assert_eq!(export.version(), &Version::new(1, 2, 0));
        assert_eq!(export.uses().collect::<Vec<_>>(), vec!["com.acme.util", "org.log"]);
        assert_eq!(export.parameters().attribute("vendor"), Some("acme"));
        assert!(export.exports_package("com.acme.spi"));
        assert!(!export.exports_package("com.acme"));
    }

    #[test]
    fn test_default_version() {
        let exports = ExportDescription::parse("p").unwrap();
        assert_eq!(exports[0].version(), &Version::zero());
    }

    #[test]
    fn test_legacy_version_alias() {
        let exports = ExportDescription::parse("p;specification-version=2.1").unwrap();
        assert_eq!(exports[0].version(), &Version::new(2, 1, 0));

        let exports = ExportDescription::parse("p;version=2.1;specification-version=2.1.0").unwrap();
        assert_eq!(exports[0].version(), &Version::new(2, 1, 0));

        let err = ExportDescription::parse("p;version=2.1;specification-version=2.2").unwrap_err();
        assert!(matches!(err, ParseError::VersionMismatch { .. }));
    }

    #[test]
    fn test_mandatory_directive() {
        let exports = ExportDescription::parse("p;mandatory:=\"vendor,tier\";vendor=acme;tier=gold").unwrap();
        assert_eq!(exports[0].mandatory().collect::<Vec<_>>(), vec!["vendor", "tier"]);
    }

    #[test]
    fn test_reserved_attributes_rejected() {
        let err = ExportDescription::parse("p;bundle-version=1.0").unwrap_err();
        assert!(matches!(err, ParseError::ReservedAttribute { .. }));
    }
}
