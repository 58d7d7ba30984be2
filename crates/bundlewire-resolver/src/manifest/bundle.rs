use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use bundlewire_version::Version;

use crate::error::ParseError;
use crate::generation::ArchiveStore;
use super::header::parse_header;
use super::{
    ExportDescription, FragmentAttachment, FragmentDescription, ImportDescription,
    RequireDescription, FRAGMENT_ATTACHMENT_DIRECTIVE, SINGLETON_DIRECTIVE,
};

/// Resolver-relevant metadata of one module, read from its manifest headers.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "IndexMap<String, String>")]
pub struct BundleManifest {
    symbolic_name: String,
    version: Version,
    singleton: bool,
    fragment_attachment: FragmentAttachment,
    exports: Vec<Arc<ExportDescription>>,
    imports: Vec<Arc<ImportDescription>>,
    requires: Vec<Arc<RequireDescription>>,
    dynamic_imports: Vec<Arc<ImportDescription>>,
    fragment_host: Option<FragmentDescription>,
}

impl BundleManifest {
    pub fn new(symbolic_name: impl Into<String>, version: Version) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            version,
            singleton: false,
            fragment_attachment: FragmentAttachment::Always,
            exports: Vec::new(),
            imports: Vec::new(),
            requires: Vec::new(),
            dynamic_imports: Vec::new(),
            fragment_host: None,
        }
    }

    /// Build a manifest from header name/value pairs. Header names are
    /// case-insensitive.
    pub fn from_headers(headers: &IndexMap<String, String>) -> Result<Self, ParseError> {
        let header = |name: &str| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        };

        let symbolic_name_value = header("Bundle-SymbolicName")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ParseError::MissingHeader("Bundle-SymbolicName"))?;
        let clauses = parse_header("Bundle-SymbolicName", symbolic_name_value)?;
        let identity = match clauses.as_slice() {
            [clause] if clause.paths.len() == 1 => clause,
            _ => {
                return Err(ParseError::InvalidHeader {
                    header: "Bundle-SymbolicName".to_string(),
                    reason: "expected exactly one symbolic name".to_string(),
                })
            }
        };

        let singleton = match identity.parameters.directive(SINGLETON_DIRECTIVE) {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(ParseError::InvalidDirective {
                    directive: SINGLETON_DIRECTIVE.to_string(),
                    value: other.to_string(),
                })
            }
        };

        let version = match header("Bundle-Version") {
            Some(raw) if !raw.trim().is_empty() => Version::parse(raw)?,
            _ => Version::zero(),
        };

        Ok(Self {
            symbolic_name: identity.paths[0].clone(),
            version,
            singleton,
            fragment_attachment: FragmentAttachment::from_directive(
                identity.parameters.directive(FRAGMENT_ATTACHMENT_DIRECTIVE),
            )?,
            exports: header("Export-Package")
                .map(ExportDescription::parse)
                .transpose()?
                .map(arcs)
                .unwrap_or_default(),
            imports: header("Import-Package")
                .map(ImportDescription::parse)
                .transpose()?
                .map(arcs)
                .unwrap_or_default(),
            requires: header("Require-Bundle")
                .map(RequireDescription::parse)
                .transpose()?
                .map(arcs)
                .unwrap_or_default(),
            dynamic_imports: header("DynamicImport-Package")
                .map(ImportDescription::parse_dynamic)
                .transpose()?
                .map(arcs)
                .unwrap_or_default(),
            fragment_host: header("Fragment-Host")
                .map(FragmentDescription::parse)
                .transpose()?,
        })
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn with_fragment_attachment(mut self, attachment: FragmentAttachment) -> Self {
        self.fragment_attachment = attachment;
        self
    }

    pub fn with_export(mut self, export: ExportDescription) -> Self {
        self.exports.push(Arc::new(export));
        self
    }

    pub fn with_import(mut self, import: ImportDescription) -> Self {
        self.imports.push(Arc::new(import));
        self
    }

    pub fn with_require(mut self, require: RequireDescription) -> Self {
        self.requires.push(Arc::new(require));
        self
    }

    pub fn with_dynamic_import(mut self, import: ImportDescription) -> Self {
        self.dynamic_imports.push(Arc::new(import));
        self
    }

    pub fn with_fragment_host(mut self, host: FragmentDescription) -> Self {
        self.fragment_host = Some(host);
        self
    }
}

fn arcs<T>(items: Vec<T>) -> Vec<Arc<T>> {
    items.into_iter().map(Arc::new).collect()
}

impl TryFrom<IndexMap<String, String>> for BundleManifest {
    type Error = ParseError;

    fn try_from(headers: IndexMap<String, String>) -> Result<Self, Self::Error> {
        BundleManifest::from_headers(&headers)
    }
}

impl ArchiveStore for BundleManifest {
    fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn is_singleton(&self) -> bool {
        self.singleton
    }

    fn fragment_attachment(&self) -> FragmentAttachment {
        self.fragment_attachment
    }

    fn export_descriptions(&self) -> &[Arc<ExportDescription>] {
        &self.exports
    }

    fn import_descriptions(&self) -> &[Arc<ImportDescription>] {
        &self.imports
    }

    fn require_descriptions(&self) -> &[Arc<RequireDescription>] {
        &self.requires
    }

    fn dynamic_import_descriptions(&self) -> &[Arc<ImportDescription>] {
        &self.dynamic_imports
    }

    fn fragment_host_description(&self) -> Option<&FragmentDescription> {
        self.fragment_host.as_ref()
    }
}
