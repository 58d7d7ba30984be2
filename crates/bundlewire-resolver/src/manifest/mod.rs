//! Capability and requirement descriptions parsed from module metadata
//!
//! Every description is immutable once built. The resolver shares them
//! behind `Arc` between checkpoints.

mod bundle;
mod export;
mod fragment;
pub mod header;
mod import;
mod parameters;
mod require;

pub use bundle::BundleManifest;
pub use export::ExportDescription;
pub use fragment::FragmentDescription;
pub use import::ImportDescription;
pub use parameters::Parameters;
pub use require::RequireDescription;

use bundlewire_version::VersionRange;

use crate::error::ParseError;

pub const VERSION_ATTRIBUTE: &str = "version";
pub const SPECIFICATION_VERSION_ATTRIBUTE: &str = "specification-version";
pub const BUNDLE_SYMBOLIC_NAME_ATTRIBUTE: &str = "bundle-symbolic-name";
pub const BUNDLE_VERSION_ATTRIBUTE: &str = "bundle-version";
pub const USES_DIRECTIVE: &str = "uses";
pub const MANDATORY_DIRECTIVE: &str = "mandatory";
pub const RESOLUTION_DIRECTIVE: &str = "resolution";
pub const VISIBILITY_DIRECTIVE: &str = "visibility";
pub const SINGLETON_DIRECTIVE: &str = "singleton";
pub const FRAGMENT_ATTACHMENT_DIRECTIVE: &str = "fragment-attachment";
pub const EXTENSION_DIRECTIVE: &str = "extension";

/// Attribute keys that never take part in arbitrary attribute matching
pub const RESERVED_MATCHING_KEYS: [&str; 5] = [
    VERSION_ATTRIBUTE,
    SPECIFICATION_VERSION_ATTRIBUTE,
    BUNDLE_SYMBOLIC_NAME_ATTRIBUTE,
    BUNDLE_VERSION_ATTRIBUTE,
    MANDATORY_DIRECTIVE,
];

/// Whether a requirement must be satisfied for its module to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    #[default]
    Mandatory,
    Optional,
}

impl Resolution {
    pub fn from_directive(value: Option<&str>) -> Result<Self, ParseError> {
        match value {
            None | Some("mandatory") => Ok(Resolution::Mandatory),
            Some("optional") => Ok(Resolution::Optional),
            Some(other) => Err(invalid_directive(RESOLUTION_DIRECTIVE, other)),
        }
    }
}

/// Whether a required module's packages are re-exported to our own requirers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Private,
    Reexport,
}

impl Visibility {
    pub fn from_directive(value: Option<&str>) -> Result<Self, ParseError> {
        match value {
            None | Some("private") => Ok(Visibility::Private),
            Some("reexport") => Ok(Visibility::Reexport),
            Some(other) => Err(invalid_directive(VISIBILITY_DIRECTIVE, other)),
        }
    }
}

/// Kind of framework extension a fragment declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Framework,
    BootClasspath,
}

impl ExtensionKind {
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        match value {
            "framework" => Ok(ExtensionKind::Framework),
            "bootclasspath" => Ok(ExtensionKind::BootClasspath),
            other => Err(invalid_directive(EXTENSION_DIRECTIVE, other)),
        }
    }
}

/// When a host accepts fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FragmentAttachment {
    /// Fragments attach while the host resolves and afterwards
    #[default]
    Always,
    /// Fragments attach only while the host itself resolves
    ResolveTime,
    Never,
}

impl FragmentAttachment {
    pub fn from_directive(value: Option<&str>) -> Result<Self, ParseError> {
        match value {
            None | Some("always") => Ok(FragmentAttachment::Always),
            Some("resolve-time") => Ok(FragmentAttachment::ResolveTime),
            Some("never") => Ok(FragmentAttachment::Never),
            Some(other) => Err(invalid_directive(FRAGMENT_ATTACHMENT_DIRECTIVE, other)),
        }
    }
}

fn invalid_directive(directive: &str, value: &str) -> ParseError {
    ParseError::InvalidDirective {
        directive: directive.to_string(),
        value: value.to_string(),
    }
}

/// Read the package version from `version` or its legacy spelling
/// `specification-version`; both may be present only if they agree.
fn package_version<'a>(package: &str, parameters: &'a Parameters) -> Result<Option<&'a str>, ParseError> {
    match (
        parameters.attribute(VERSION_ATTRIBUTE),
        parameters.attribute(SPECIFICATION_VERSION_ATTRIBUTE),
    ) {
        (Some(version), Some(legacy)) => {
            let same = match (VersionRange::parse(version), VersionRange::parse(legacy)) {
                (Ok(a), Ok(b)) => a == b,
                _ => version.trim() == legacy.trim(),
            };
            if same {
                Ok(Some(version))
            } else {
                Err(ParseError::VersionMismatch {
                    package: package.to_string(),
                    version: version.to_string(),
                    legacy: legacy.to_string(),
                })
            }
        }
        (Some(version), None) | (None, Some(version)) => Ok(Some(version)),
        (None, None) => Ok(None),
    }
}
