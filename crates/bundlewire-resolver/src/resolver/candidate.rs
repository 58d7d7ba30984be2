//! Candidate wrappers over generations
//!
//! A candidate is a generation in one of three resolution states. Equality
//! and hashing always go through the wrapped generation's id so a candidate
//! can be looked up across checkpoints while its wiring grows.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::IncompatibleError;
use crate::generation::{Generation, GenerationId};
use crate::manifest::{ExportDescription, ImportDescription, RequireDescription};
use super::matching::matches;

/// One exported package offered by a candidate
#[derive(Debug, Clone)]
pub struct ExportOffer {
    pub package_name: String,
    pub export: Arc<ExportDescription>,
    /// Set when the package is re-exported from a required bundle
    pub source: Option<Arc<Generation>>,
}

impl ExportOffer {
    /// The generation that really exports the package offered by `owner`
    pub fn exporter<'a>(&'a self, owner: &'a Arc<Generation>) -> &'a Arc<Generation> {
        self.source.as_ref().unwrap_or(owner)
    }
}

/// One package of an import description, i.e. a single wiring requirement
#[derive(Debug, Clone)]
pub struct PackageImport {
    pub package_name: String,
    pub description: Arc<ImportDescription>,
}

impl PackageImport {
    pub fn new(package_name: impl Into<String>, description: Arc<ImportDescription>) -> Self {
        Self {
            package_name: package_name.into(),
            description,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.description.is_optional()
    }
}

/// A resolved package import. Only one wiring per package is legal on a
/// candidate, so equality is keyed by package name alone.
#[derive(Debug, Clone)]
pub struct CandidateWiring {
    pub package_name: String,
    pub export: Arc<ExportDescription>,
    pub exporter: Arc<Generation>,
}

impl PartialEq for CandidateWiring {
    fn eq(&self, other: &Self) -> bool {
        self.package_name == other.package_name
    }
}

impl Eq for CandidateWiring {}

impl Hash for CandidateWiring {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.package_name.hash(state);
    }
}

/// An accepted `Require-Bundle` entry
#[derive(Debug, Clone)]
pub struct RequiredCandidate {
    pub description: Arc<RequireDescription>,
    pub provider: Arc<Generation>,
}

#[derive(Debug, Clone)]
pub enum Candidate {
    /// Installed and not yet considered by this search
    Unresolved(Unresolved),
    /// Wired by an earlier resolution
    Resolved(Resolved),
    /// Being resolved by this search
    Bound(Bound),
}

impl Candidate {
    pub fn id(&self) -> GenerationId {
        self.generation().id()
    }

    pub fn generation(&self) -> &Arc<Generation> {
        match self {
            Candidate::Unresolved(c) => &c.generation,
            Candidate::Resolved(c) => &c.generation,
            Candidate::Bound(c) => &c.host,
        }
    }

    pub fn exports(&self) -> &[ExportOffer] {
        match self {
            Candidate::Unresolved(c) => &c.exports,
            Candidate::Resolved(c) => &c.exports,
            Candidate::Bound(c) => &c.exports,
        }
    }

    pub fn export_for(&self, package: &str) -> Option<&ExportOffer> {
        self.exports().iter().find(|offer| offer.package_name == package)
    }

    pub fn wiring(&self, package: &str) -> Option<&CandidateWiring> {
        match self {
            Candidate::Unresolved(_) => None,
            Candidate::Resolved(c) => c.wirings.get(package),
            Candidate::Bound(c) => c.wirings.get(package),
        }
    }

    pub fn wirings(&self) -> impl Iterator<Item = &CandidateWiring> {
        let wirings = match self {
            Candidate::Unresolved(_) => None,
            Candidate::Resolved(c) => Some(&c.wirings),
            Candidate::Bound(c) => Some(&c.wirings),
        };
        wirings.into_iter().flat_map(|w| w.values())
    }

    pub fn required(&self) -> &[RequiredCandidate] {
        match self {
            Candidate::Unresolved(_) => &[],
            Candidate::Resolved(c) => &c.required,
            Candidate::Bound(c) => &c.required,
        }
    }

    pub fn fragments(&self) -> &[Arc<Generation>] {
        match self {
            Candidate::Unresolved(_) => &[],
            Candidate::Resolved(c) => &c.fragments,
            Candidate::Bound(c) => &c.fragments,
        }
    }

    pub fn as_bound(&self) -> Option<&Bound> {
        match self {
            Candidate::Bound(bound) => Some(bound),
            _ => None,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct Unresolved {
    generation: Arc<Generation>,
    exports: Vec<ExportOffer>,
}

impl Unresolved {
    pub fn new(generation: &Arc<Generation>) -> Self {
        Self {
            generation: generation.clone(),
            exports: exports_of(generation),
        }
    }

    pub fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }
}

#[derive(Debug, Clone)]
pub struct Resolved {
    generation: Arc<Generation>,
    fragments: Vec<Arc<Generation>>,
    exports: Vec<ExportOffer>,
    wirings: IndexMap<String, CandidateWiring>,
    required: Vec<RequiredCandidate>,
}

impl Resolved {
    /// Wrap a resolved generation, seeding its candidate state from the
    /// wiring it was resolved with.
    pub fn new(generation: &Arc<Generation>) -> Self {
        let fragments = generation.fragments();
        let mut exports = exports_of(generation);
        for fragment in &fragments {
            exports.extend(exports_of(fragment));
        }

        let wirings = generation
            .wires()
            .into_iter()
            .map(|wire| {
                (
                    wire.package_name.clone(),
                    CandidateWiring {
                        package_name: wire.package_name,
                        export: wire.export,
                        exporter: wire.exporter,
                    },
                )
            })
            .collect();

        let required_wires = generation.required_bundle_wires();
        for wire in required_wires.iter().filter(|wire| wire.reexport) {
            reexport(&mut exports, wire.wires.iter().map(|w| (&w.package_name, &w.export, &w.exporter)));
        }
        let required = required_wires
            .into_iter()
            .map(|wire| RequiredCandidate {
                description: wire.description,
                provider: wire.exporter,
            })
            .collect();

        Self {
            generation: generation.clone(),
            fragments,
            exports,
            wirings,
            required,
        }
    }

    pub fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }
}

/// A host being resolved together with the fragments bound to it.
///
/// The remaining imports and requires shrink as the search decides them;
/// wirings and required bundles only grow.
#[derive(Debug, Clone)]
pub struct Bound {
    host: Arc<Generation>,
    fragments: Vec<Arc<Generation>>,
    imports: VecDeque<PackageImport>,
    requires: VecDeque<Arc<RequireDescription>>,
    exports: Vec<ExportOffer>,
    required: Vec<RequiredCandidate>,
    wirings: IndexMap<String, CandidateWiring>,
}

impl Bound {
    pub fn new(host: &Arc<Generation>) -> Self {
        Self {
            host: host.clone(),
            fragments: Vec::new(),
            imports: imports_of(host).collect(),
            requires: host.archive_store().require_descriptions().iter().cloned().collect(),
            exports: exports_of(host),
            required: Vec::new(),
            wirings: IndexMap::new(),
        }
    }

    /// Reopen a resolved host, keeping its existing wiring
    pub fn from_resolved(resolved: &Resolved) -> Self {
        Self {
            host: resolved.generation.clone(),
            fragments: resolved.fragments.clone(),
            imports: VecDeque::new(),
            requires: VecDeque::new(),
            exports: resolved.exports.clone(),
            required: resolved.required.clone(),
            wirings: resolved.wirings.clone(),
        }
    }

    /// Merge a fragment's requirements and capabilities into this host
    pub fn attach(&mut self, fragment: &Arc<Generation>) -> Result<(), IncompatibleError> {
        if self.fragments.iter().any(|f| f.symbolic_name() == fragment.symbolic_name()) {
            return Err(IncompatibleError::FragmentAttachment {
                fragment: fragment.id(),
                host: self.host.id(),
                reason: format!("another {} fragment is already attached", fragment.symbolic_name()),
            });
        }

        for import in imports_of(fragment) {
            if let Some(existing) = self.wirings.get(&import.package_name) {
                if !matches(&import, &existing.export, &existing.exporter) {
                    return Err(IncompatibleError::FragmentAttachment {
                        fragment: fragment.id(),
                        host: self.host.id(),
                        reason: format!(
                            "import of {} is not satisfied by the host's wiring to {}",
                            import.package_name, existing.exporter
                        ),
                    });
                }
                continue;
            }
            self.imports.push_back(import);
        }

        for require in fragment.archive_store().require_descriptions() {
            let already_required = self
                .required
                .iter()
                .any(|r| r.description.symbolic_name() == require.symbolic_name());
            if !already_required {
                self.requires.push_back(require.clone());
            }
        }

        self.exports.extend(exports_of(fragment));
        self.fragments.push(fragment.clone());
        Ok(())
    }

    pub fn host(&self) -> &Arc<Generation> {
        &self.host
    }

    pub fn fragments(&self) -> &[Arc<Generation>] {
        &self.fragments
    }

    pub fn exports(&self) -> &[ExportOffer] {
        &self.exports
    }

    pub fn wirings(&self) -> &IndexMap<String, CandidateWiring> {
        &self.wirings
    }

    pub fn required(&self) -> &[RequiredCandidate] {
        &self.required
    }

    pub fn next_import(&self) -> Option<&PackageImport> {
        self.imports.front()
    }

    pub fn next_require(&self) -> Option<&Arc<RequireDescription>> {
        self.requires.front()
    }

    pub(crate) fn pop_import(&mut self) -> Option<PackageImport> {
        self.imports.pop_front()
    }

    pub(crate) fn pop_require(&mut self) -> Option<Arc<RequireDescription>> {
        self.requires.pop_front()
    }

    pub(crate) fn set_imports(&mut self, imports: Vec<PackageImport>) {
        self.imports = imports.into();
    }

    /// Record a wiring; a second wiring for the same package is refused
    pub(crate) fn add_wiring(&mut self, wiring: CandidateWiring) -> Result<(), IncompatibleError> {
        if self.wirings.contains_key(&wiring.package_name) {
            return Err(IncompatibleError::DuplicateWiring {
                module: self.host.id(),
                package: wiring.package_name,
            });
        }
        self.wirings.insert(wiring.package_name.clone(), wiring);
        Ok(())
    }

    /// Record an accepted require. The packages `visible` through a
    /// re-exporting require join our export set.
    pub(crate) fn add_required(&mut self, required: RequiredCandidate, visible: &[CandidateWiring]) {
        if required.description.is_reexport() {
            reexport(
                &mut self.exports,
                visible.iter().map(|w| (&w.package_name, &w.export, &w.exporter)),
            );
        }
        self.required.push(required);
    }

    /// An import satisfied elsewhere supersedes our own export of that package
    pub(crate) fn remove_export(&mut self, package: &str) {
        self.exports.retain(|offer| offer.package_name != package);
    }
}

/// Every exported package of one generation, one offer per package name
pub fn exports_of(generation: &Generation) -> Vec<ExportOffer> {
    generation
        .archive_store()
        .export_descriptions()
        .iter()
        .flat_map(|export| {
            export.package_names().map(move |package| ExportOffer {
                package_name: package.to_string(),
                export: export.clone(),
                source: None,
            })
        })
        .collect()
}

/// Offer re-exported packages; packages already offered keep their offer
fn reexport<'a>(
    exports: &mut Vec<ExportOffer>,
    packages: impl Iterator<Item = (&'a String, &'a Arc<ExportDescription>, &'a Arc<Generation>)>,
) {
    for (package_name, export, source) in packages {
        if exports.iter().any(|offer| &offer.package_name == package_name) {
            continue;
        }
        exports.push(ExportOffer {
            package_name: package_name.clone(),
            export: export.clone(),
            source: Some(source.clone()),
        });
    }
}

fn imports_of(generation: &Generation) -> impl Iterator<Item = PackageImport> + '_ {
    generation
        .archive_store()
        .import_descriptions()
        .iter()
        .flat_map(|import| {
            import
                .package_names()
                .map(move |package| PackageImport::new(package, import.clone()))
        })
}
