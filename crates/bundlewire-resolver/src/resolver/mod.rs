//! Wiring resolution
//!
//! [`Resolver`] keeps track of every installed generation and answers two
//! questions: how to wire a freshly installed module (and whatever it pulls
//! in), and how to wire one more package onto an already resolved module.
//! The answer is a list of [`Solution`]s; nothing changes until the caller
//! applies them.

mod candidate;
mod checkpoint;
mod combinations;
mod matching;
mod policy;
mod search;
mod solution;


use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::config::{BootDelegation, ResolverConfig};
use crate::error::{ResolverError, Result};
use crate::generation::{Generation, GenerationId, State};
use crate::manifest::ImportDescription;
use candidate::PackageImport;
use checkpoint::CheckPoint;
use search::Search;
use solution::extract_solutions;

pub use policy::Policy;
pub use search::SYSTEM_BUNDLE_ALIAS;
pub use solution::{RequiredBundleWire, Solution, Wire};
pub(crate) use solution::AppliedWiring;

/// The framework the resolver runs inside
pub trait Framework: Send + Sync {
    /// Symbolic name of the framework's own module
    fn system_bundle(&self) -> &str;

    /// Packages served by the boot class path and never wired
    fn boot_delegation(&self) -> &BootDelegation;
}

/// A [`Framework`] with fixed settings
#[derive(Debug, Clone)]
pub struct StaticFramework {
    system_bundle: String,
    boot_delegation: BootDelegation,
}

impl StaticFramework {
    pub fn new(system_bundle: impl Into<String>, boot_delegation: BootDelegation) -> Self {
        Self {
            system_bundle: system_bundle.into(),
            boot_delegation,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.system_bundle.clone(), config.boot_delegation())
    }
}

impl Default for StaticFramework {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl Framework for StaticFramework {
    fn system_bundle(&self) -> &str {
        &self.system_bundle
    }

    fn boot_delegation(&self) -> &BootDelegation {
        &self.boot_delegation
    }
}

#[derive(Default)]
struct ResolverState {
    framework: Option<Arc<dyn Framework>>,
    bundles: IndexMap<GenerationId, Arc<Generation>>,
    /// Package name to the generations whose own manifest exports it
    index_by_package: IndexMap<String, Vec<GenerationId>>,
}

impl ResolverState {
    fn framework(&self) -> Result<Arc<dyn Framework>> {
        self.framework
            .clone()
            .ok_or_else(|| ResolverError::IllegalState("resolver is not started".to_string()))
    }

    fn ensure_started(&self) -> Result<()> {
        self.framework().map(|_| ())
    }

    fn tracked(&self, generation: &Arc<Generation>) -> Result<()> {
        match self.bundles.get(&generation.id()) {
            Some(known) if Arc::ptr_eq(known, generation) => Ok(()),
            _ => Err(ResolverError::UnknownGeneration(generation.id())),
        }
    }

    /// Every generation a resolution may use: installed or resolved, never uninstalled
    fn canonical(&self) -> Vec<Arc<Generation>> {
        self.bundles
            .values()
            .filter(|generation| generation.state() != State::Uninstalled)
            .cloned()
            .collect()
    }

    fn index(&mut self, generation: &Generation) {
        for export in generation.archive_store().export_descriptions() {
            for package in export.package_names() {
                let ids = self.index_by_package.entry(package.to_string()).or_default();
                if !ids.contains(&generation.id()) {
                    ids.push(generation.id());
                }
            }
        }
    }

    fn unindex(&mut self, generation: &Generation) {
        for ids in self.index_by_package.values_mut() {
            ids.retain(|id| *id != generation.id());
        }
        self.index_by_package.retain(|_, ids| !ids.is_empty());
    }
}

/// Resolves module generations against everything installed.
///
/// All operations serialise on one lock; a resolution sees a consistent
/// snapshot of the installed generations.
pub struct Resolver {
    policy: Policy,
    state: Mutex<ResolverState>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

impl Resolver {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: Mutex::new(ResolverState::default()),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(Policy::from_config(config))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().framework.is_some()
    }

    pub fn start(&self, framework: Arc<dyn Framework>) -> Result<()> {
        let mut state = self.state.lock();
        if state.framework.is_some() {
            return Err(ResolverError::IllegalState("resolver is already started".to_string()));
        }
        log::debug!("Resolver started with system bundle {}", framework.system_bundle());
        state.framework = Some(framework);
        Ok(())
    }

    /// Forget the framework and every tracked generation
    pub fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_started()?;
        log::debug!("Resolver stopped, dropping {} generations", state.bundles.len());
        *state = ResolverState::default();
        Ok(())
    }

    /// Track a newly installed generation
    pub fn added(&self, generation: Arc<Generation>) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_started()?;
        if state.bundles.contains_key(&generation.id()) {
            return Err(ResolverError::IllegalState(format!(
                "generation {} is already tracked",
                generation.id()
            )));
        }

        log::trace!("Tracking {}", generation);
        state.index(&generation);
        state.bundles.insert(generation.id(), generation);
        Ok(())
    }

    /// Stop tracking an uninstalled generation. Modules already wired to it
    /// keep their wiring.
    pub fn removed(&self, generation: &Generation) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_started()?;
        if state.bundles.shift_remove(&generation.id()).is_none() {
            return Err(ResolverError::UnknownGeneration(generation.id()));
        }

        log::trace!("Untracking {}", generation);
        state.unindex(generation);
        Ok(())
    }

    /// Tracked generations whose manifest exports `package`
    pub fn exporters(&self, package: &str) -> Vec<Arc<Generation>> {
        let state = self.state.lock();
        state
            .index_by_package
            .get(package)
            .into_iter()
            .flatten()
            .filter_map(|id| state.bundles.get(id).cloned())
            .collect()
    }

    pub fn generations(&self) -> Vec<Arc<Generation>> {
        self.state.lock().bundles.values().cloned().collect()
    }

    /// Compute the wiring for an installed generation. On success the result
    /// holds one solution per module that has to be resolved, the target
    /// included; fragments appear inside their host's solution.
    pub fn resolve(&self, generation: &Arc<Generation>) -> Result<Vec<Solution>> {
        let start = Instant::now();
        let state = self.state.lock();
        let framework = state.framework()?;
        state.tracked(generation)?;

        if generation.state() != State::Installed {
            return Err(ResolverError::IllegalState(format!(
                "{} is {:?}, only installed generations can be resolved",
                generation,
                generation.state()
            )));
        }

        let checkpoint = CheckPoint::new(&state.canonical(), generation)?;
        let search = Search::new(framework.as_ref(), &self.policy, &state.index_by_package);
        let outcome = search.run(checkpoint);

        match outcome {
            Some(done) => {
                let solutions = extract_solutions(&done);
                log::info!(
                    "Resolved {} into {} solutions after {} steps in {:.2?}",
                    generation,
                    solutions.len(),
                    search.steps(),
                    start.elapsed()
                );
                Ok(solutions)
            }
            None => {
                log::info!(
                    "Failed to resolve {} after {} steps in {:.2?}",
                    generation,
                    search.steps(),
                    start.elapsed()
                );
                Err(ResolverError::NoSolution {
                    module: generation.to_string(),
                })
            }
        }
    }

    /// Wire the packages named by a dynamic import onto a resolved
    /// generation. Wildcard names expand to every indexed package they
    /// cover; those expanded imports are optional.
    pub fn resolve_dynamic(&self, generation: &Arc<Generation>, import: &ImportDescription) -> Result<Vec<Solution>> {
        let start = Instant::now();
        let state = self.state.lock();
        let framework = state.framework()?;
        state.tracked(generation)?;

        if !generation.state().is_resolved() {
            return Err(ResolverError::IllegalState(format!(
                "{} must be resolved before packages can be imported dynamically",
                generation
            )));
        }

        let imports = expand_dynamic_import(import, &state.index_by_package);
        if imports.is_empty() {
            return Err(ResolverError::NoSolution {
                module: generation.to_string(),
            });
        }

        let checkpoint = CheckPoint::for_dynamic_import(&state.canonical(), generation, imports)?;
        let search = Search::new(framework.as_ref(), &self.policy, &state.index_by_package);

        match search.run_pending(checkpoint) {
            Some(done) => {
                let solutions = extract_solutions(&done);
                log::info!(
                    "Dynamically resolved {} into {} solutions in {:.2?}",
                    generation,
                    solutions.len(),
                    start.elapsed()
                );
                Ok(solutions)
            }
            None => {
                log::info!("Dynamic import for {} failed in {:.2?}", generation, start.elapsed());
                Err(ResolverError::NoSolution {
                    module: generation.to_string(),
                })
            }
        }
    }
}

fn expand_dynamic_import(
    import: &ImportDescription,
    index: &IndexMap<String, Vec<GenerationId>>,
) -> Vec<PackageImport> {
    let exact = Arc::new(import.clone());
    let wildcard = Arc::new(import.clone().optional());
    let mut imports: Vec<PackageImport> = Vec::new();

    let mut push = |package: &str, description: &Arc<ImportDescription>| {
        if !imports.iter().any(|i| i.package_name == package) {
            imports.push(PackageImport::new(package, description.clone()));
        }
    };

    for name in import.package_names() {
        if name == "*" {
            for package in index.keys() {
                push(package, &wildcard);
            }
        } else if let Some(prefix) = name.strip_suffix('*') {
            for package in index.keys().filter(|p| p.starts_with(prefix)) {
                push(package, &wildcard);
            }
        } else {
            push(name, &exact);
        }
    }

    imports
}
