//! Module generations as seen by the resolver
//!
//! A generation is one installed incarnation of a module. Updating a module
//! produces a new generation while dependents stay wired to the old one, so
//! the resolver identifies generations by [`GenerationId`] and never by
//! symbolic name or version.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use bundlewire_version::Version;

use crate::manifest::{
    ExportDescription, ExtensionKind, FragmentAttachment, FragmentDescription, ImportDescription,
    RequireDescription,
};
use crate::resolver::{AppliedWiring, RequiredBundleWire, Solution, Wire};

/// Metadata accessor for the content of one generation
pub trait ArchiveStore: fmt::Debug + Send + Sync {
    fn symbolic_name(&self) -> &str;

    fn version(&self) -> &Version;

    fn is_singleton(&self) -> bool;

    fn fragment_attachment(&self) -> FragmentAttachment {
        FragmentAttachment::Always
    }

    fn export_descriptions(&self) -> &[Arc<ExportDescription>];

    fn import_descriptions(&self) -> &[Arc<ImportDescription>];

    fn require_descriptions(&self) -> &[Arc<RequireDescription>];

    fn dynamic_import_descriptions(&self) -> &[Arc<ImportDescription>] {
        &[]
    }

    fn fragment_host_description(&self) -> Option<&FragmentDescription>;
}

/// Identity of a generation: the owning module plus its generation counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId {
    pub bundle_id: u64,
    pub generation: u32,
}

impl GenerationId {
    pub fn new(bundle_id: u64, generation: u32) -> Self {
        Self { bundle_id, generation }
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.bundle_id, self.generation)
    }
}

/// Lifecycle state. Only `Installed` and `Resolved` matter to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Installed,
    Resolved,
    Starting,
    Active,
    Stopping,
    Uninstalled,
}

impl State {
    /// True for every state in which the generation carries a wiring
    pub fn is_resolved(&self) -> bool {
        matches!(self, State::Resolved | State::Starting | State::Active | State::Stopping)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    Bundle,
    Fragment,
    FrameworkExtension,
}

pub struct Generation {
    id: GenerationId,
    archive: Arc<dyn ArchiveStore>,
    state: RwLock<State>,
    wiring: RwLock<Option<Arc<AppliedWiring>>>,
}

impl Generation {
    pub fn new(bundle_id: u64, generation: u32, archive: Arc<dyn ArchiveStore>) -> Arc<Self> {
        Arc::new(Self {
            id: GenerationId::new(bundle_id, generation),
            archive,
            state: RwLock::new(State::Installed),
            wiring: RwLock::new(None),
        })
    }

    pub fn id(&self) -> GenerationId {
        self.id
    }

    pub fn archive_store(&self) -> &Arc<dyn ArchiveStore> {
        &self.archive
    }

    pub fn symbolic_name(&self) -> &str {
        self.archive.symbolic_name()
    }

    pub fn version(&self) -> &Version {
        self.archive.version()
    }

    pub fn is_singleton(&self) -> bool {
        self.archive.is_singleton()
    }

    pub fn kind(&self) -> GenerationKind {
        match self.archive.fragment_host_description() {
            None => GenerationKind::Bundle,
            Some(host) => match host.extension() {
                Some(ExtensionKind::Framework) | Some(ExtensionKind::BootClasspath) => {
                    GenerationKind::FrameworkExtension
                }
                None => GenerationKind::Fragment,
            },
        }
    }

    /// Fragments and framework extensions both attach to a host
    pub fn is_fragment(&self) -> bool {
        self.kind() != GenerationKind::Bundle
    }

    pub fn fragment_host_description(&self) -> Option<&FragmentDescription> {
        self.archive.fragment_host_description()
    }

    pub fn state(&self) -> State {
        *self.state.read()
    }

    pub fn set_state(&self, state: State) {
        *self.state.write() = state;
    }

    /// The solution this generation was resolved with, if any
    pub fn wiring(&self) -> Option<Solution> {
        self.wiring.read().as_ref().and_then(|wiring| wiring.solution())
    }

    pub(crate) fn set_wiring(&self, wiring: Option<Arc<AppliedWiring>>) {
        *self.wiring.write() = wiring;
    }

    pub fn wires(&self) -> Vec<Wire> {
        self.wiring()
            .map(|solution| solution.wires)
            .unwrap_or_default()
    }

    pub fn required_bundle_wires(&self) -> Vec<RequiredBundleWire> {
        self.wiring()
            .map(|solution| solution.required_bundle_wires)
            .unwrap_or_default()
    }

    /// Fragments attached to this host by its current wiring
    pub fn fragments(&self) -> Vec<Arc<Generation>> {
        self.wiring()
            .map(|solution| solution.fragments)
            .unwrap_or_default()
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("symbolic_name", &self.symbolic_name())
            .field("version", self.version())
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{} [{}]", self.symbolic_name(), self.version(), self.id)
    }
}
