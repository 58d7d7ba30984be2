//! Depth-first search over checkpoints
//!
//! Each step picks the next undecided requirement of the resolving candidate
//! and tries its providers in preference order, recursing on the checkpoint
//! each choice produces. A `None` return unwinds to the previous choice
//! point.

use std::cell::Cell;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::generation::{Generation, GenerationId, GenerationKind};
use crate::manifest::{ExportDescription, RequireDescription};
use super::candidate::{Candidate, PackageImport};
use super::checkpoint::CheckPoint;
use super::combinations::Combinations;
use super::matching::{accepted_constraints, implied_constraints, is_consistent, matches, visible_exports};
use super::policy::Policy;
use super::Framework;

/// Symbolic name any fragment may use to address the framework's own module
pub const SYSTEM_BUNDLE_ALIAS: &str = "system.bundle";

struct WireCandidate {
    exporter: Arc<Generation>,
    export: Arc<ExportDescription>,
}

pub(crate) struct Search<'a> {
    framework: &'a dyn Framework,
    policy: &'a Policy,
    index: &'a IndexMap<String, Vec<GenerationId>>,
    steps: Cell<u64>,
}

impl<'a> Search<'a> {
    pub fn new(
        framework: &'a dyn Framework,
        policy: &'a Policy,
        index: &'a IndexMap<String, Vec<GenerationId>>,
    ) -> Self {
        Self {
            framework,
            policy,
            index,
            steps: Cell::new(0),
        }
    }

    /// Number of requirement decisions attempted so far
    pub fn steps(&self) -> u64 {
        self.steps.get()
    }

    /// Resolve the candidate the checkpoint starts with
    pub fn run(&self, checkpoint: CheckPoint) -> Option<CheckPoint> {
        self.do_resolve(checkpoint)
    }

    /// Continue with the requirements already queued on the resolving
    /// candidate, without considering new fragments
    pub fn run_pending(&self, checkpoint: CheckPoint) -> Option<CheckPoint> {
        self.do_resolve_bundle(checkpoint)
    }

    fn do_resolve(&self, checkpoint: CheckPoint) -> Option<CheckPoint> {
        let Some(id) = checkpoint.resolving() else {
            return self.do_resolve_bundle(checkpoint);
        };
        let generation = checkpoint.generation(&id)?;

        if generation.is_fragment() {
            self.resolve_fragment(checkpoint, &generation)
        } else {
            self.resolve_host(checkpoint, &generation)
        }
    }

    fn resolve_fragment(&self, checkpoint: CheckPoint, fragment: &Arc<Generation>) -> Option<CheckPoint> {
        let hosts = self.find_hosts(&checkpoint, fragment);
        if hosts.is_empty() {
            log::debug!("No host available for fragment {}", fragment);
            return None;
        }

        for host in hosts {
            match checkpoint.attach_fragment(&fragment.id(), &host) {
                Ok(next) => {
                    log::trace!("Trying {} as host of {}", host, fragment);
                    if let Some(done) = self.do_resolve_bundle(next) {
                        return Some(done);
                    }
                }
                Err(e) => log::debug!("{}", e),
            }
        }
        None
    }

    fn resolve_host(&self, checkpoint: CheckPoint, host: &Arc<Generation>) -> Option<CheckPoint> {
        let fragments = self.available_fragments(&checkpoint, host);

        for combination in Combinations::new(&fragments) {
            let next = if combination.is_empty() {
                Ok(checkpoint.clone())
            } else {
                checkpoint.bind_fragments(&host.id(), &combination)
            };

            match next {
                Ok(next) => {
                    if let Some(done) = self.do_resolve_bundle(next) {
                        return Some(done);
                    }
                }
                Err(e) => log::debug!("{}", e),
            }
        }
        None
    }

    fn do_resolve_bundle(&self, checkpoint: CheckPoint) -> Option<CheckPoint> {
        if checkpoint.resolving().is_none() {
            return self.advance(checkpoint);
        }
        self.resolve_required_bundles(checkpoint)
    }

    fn advance(&self, mut checkpoint: CheckPoint) -> Option<CheckPoint> {
        checkpoint.resolve_completed();
        if checkpoint.is_done() {
            return Some(checkpoint);
        }
        checkpoint.next_bundle();
        self.do_resolve(checkpoint)
    }

    fn resolve_required_bundles(&self, checkpoint: CheckPoint) -> Option<CheckPoint> {
        let Some(require) = checkpoint.next_require() else {
            return self.resolve_wires(checkpoint);
        };
        self.tick();

        for provider in self.require_candidates(&checkpoint, &require) {
            if !self.is_require_consistent(&checkpoint, &provider) {
                log::trace!("Required bundle {} conflicts with the current wiring", provider);
                continue;
            }

            let next = match checkpoint.candidate(&provider.id()) {
                Some(Candidate::Resolved(_)) => checkpoint.new_checkpoint_used(&provider.id()),
                Some(Candidate::Bound(_)) => checkpoint.new_checkpoint_bound(&provider.id()),
                Some(Candidate::Unresolved(_)) => checkpoint.new_checkpoint_unbound(&provider.id()),
                None => continue,
            };

            match next {
                Ok(next) => {
                    if let Some(done) = self.resolve_required_bundles(next) {
                        return Some(done);
                    }
                }
                Err(e) => log::debug!("{}", e),
            }
        }

        if require.is_optional() {
            log::trace!("Skipping optional required bundle {}", require.symbolic_name());
            return self.resolve_required_bundles(checkpoint.skip_require());
        }

        log::debug!("No provider for required bundle {} {}", require.symbolic_name(), require.version_range());
        None
    }

    fn resolve_wires(&self, checkpoint: CheckPoint) -> Option<CheckPoint> {
        let Some(import) = checkpoint.next_import() else {
            return self.advance(checkpoint);
        };
        self.tick();
        let bound = checkpoint.resolving_bound()?;

        if let Some(existing) = bound.wirings().get(&import.package_name) {
            if matches(&import, &existing.export, &existing.exporter) || import.is_optional() {
                return self.resolve_wires(checkpoint.skip_import());
            }
            log::debug!("{} is already wired to {}", import.package_name, existing.exporter);
            return None;
        }

        if self.framework.boot_delegation().matches(&import.package_name) {
            log::trace!("{} is boot delegated", import.package_name);
            return self.resolve_wires(checkpoint.skip_import());
        }

        let self_export = bound
            .exports()
            .iter()
            .find(|offer| offer.package_name == import.package_name)
            .is_some_and(|offer| matches(&import, &offer.export, offer.exporter(bound.host())));

        let accepted = accepted_constraints(&checkpoint, bound);
        for candidate in self.wire_candidates(&checkpoint, &import) {
            let mut implied = implied_constraints(&checkpoint, &import.package_name, &candidate.export, &candidate.exporter);
            implied.extend(accepted.iter().cloned());
            if !is_consistent(&checkpoint, &implied) {
                log::trace!("Wiring {} to {} violates uses constraints", import.package_name, candidate.exporter);
                continue;
            }

            match checkpoint.new_checkpoint_wire(&candidate.exporter, candidate.export.clone()) {
                Ok(next) => {
                    if let Some(done) = self.resolve_wires(next) {
                        return Some(done);
                    }
                }
                Err(e) => log::debug!("{}", e),
            }
        }

        if self_export || import.is_optional() {
            return self.resolve_wires(checkpoint.skip_import());
        }

        log::debug!(
            "No exporter for {} {} required by {}",
            import.package_name,
            import.description.version_range(),
            bound.host()
        );
        None
    }

    /// Exporters able to satisfy `import`, best first: settled providers,
    /// then idle resolved ones, then unresolved ones, then providers still
    /// being resolved.
    fn wire_candidates(&self, checkpoint: &CheckPoint, import: &PackageImport) -> Vec<WireCandidate> {
        let self_id = checkpoint.resolving();
        let mut settled = Vec::new();
        let mut idle = Vec::new();
        let mut unresolved = Vec::new();
        let mut in_progress = Vec::new();

        for candidate in checkpoint.candidates() {
            let id = candidate.id();
            if Some(id) == self_id || !self.may_export(candidate, &import.package_name) {
                continue;
            }

            let pool = match candidate {
                Candidate::Resolved(_) if checkpoint.is_used(&id) => &mut settled,
                Candidate::Resolved(_) => &mut idle,
                Candidate::Bound(_) if checkpoint.is_settled(&id) => &mut settled,
                Candidate::Bound(_) => &mut in_progress,
                Candidate::Unresolved(_) => {
                    if candidate.generation().is_fragment() || !checkpoint.is_unused(&id) {
                        continue;
                    }
                    &mut unresolved
                }
            };

            let exporter = candidate.generation();
            // Re-exported packages are offered by their source
            for offer in candidate.exports().iter().filter(|offer| offer.source.is_none()) {
                if offer.package_name == import.package_name && matches(import, &offer.export, exporter) {
                    pool.push(WireCandidate {
                        exporter: exporter.clone(),
                        export: offer.export.clone(),
                    });
                }
            }
        }

        let mut ordered = Vec::new();
        for mut pool in [settled, idle, unresolved, in_progress] {
            self.policy
                .sort(&mut pool, |c| (c.export.version(), c.exporter.id()));
            ordered.extend(pool);
        }
        ordered
    }

    fn may_export(&self, candidate: &Candidate, package: &str) -> bool {
        !candidate.fragments().is_empty()
            || self
                .index
                .get(package)
                .is_some_and(|ids| ids.contains(&candidate.id()))
    }

    /// Providers for `require`: candidates already in use first, then the rest
    fn require_candidates(&self, checkpoint: &CheckPoint, require: &RequireDescription) -> Vec<Arc<Generation>> {
        let self_id = checkpoint.resolving();
        let eligible = |id: &GenerationId| -> Option<Arc<Generation>> {
            if Some(*id) == self_id {
                return None;
            }
            let generation = checkpoint.generation(id)?;
            let acceptable = !generation.is_fragment()
                && generation.symbolic_name() == require.symbolic_name()
                && require.version_range().includes(generation.version());
            acceptable.then_some(generation)
        };

        let mut used: Vec<_> = checkpoint.used().filter_map(eligible).collect();
        let mut unused: Vec<_> = checkpoint.unused().filter_map(eligible).collect();
        self.policy.sort(&mut used, |g| (g.version(), g.id()));
        self.policy.sort(&mut unused, |g| (g.version(), g.id()));
        used.extend(unused);
        used
    }

    fn is_require_consistent(&self, checkpoint: &CheckPoint, provider: &Arc<Generation>) -> bool {
        let mut implied = checkpoint
            .resolving_bound()
            .map(|bound| accepted_constraints(checkpoint, bound))
            .unwrap_or_default();
        for visible in visible_exports(checkpoint, provider) {
            implied.extend(implied_constraints(
                checkpoint,
                &visible.package_name,
                &visible.export,
                &visible.exporter,
            ));
        }
        is_consistent(checkpoint, &implied)
    }

    /// Hosts `fragment` may attach to: resolved hosts first, then hosts
    /// bound by this search, then unresolved ones.
    fn find_hosts(&self, checkpoint: &CheckPoint, fragment: &Generation) -> Vec<GenerationId> {
        let mut resolved = Vec::new();
        let mut bound = Vec::new();
        let mut unresolved = Vec::new();

        for candidate in checkpoint.candidates() {
            let host = candidate.generation();
            if !self.is_host_of(fragment, host) {
                continue;
            }
            match candidate {
                Candidate::Resolved(_) => resolved.push(host.clone()),
                Candidate::Bound(_) => bound.push(host.clone()),
                Candidate::Unresolved(_) => unresolved.push(host.clone()),
            }
        }

        let mut hosts = Vec::new();
        for mut pool in [resolved, bound, unresolved] {
            self.policy.sort(&mut pool, |g| (g.version(), g.id()));
            hosts.extend(pool.iter().map(|g| g.id()));
        }
        hosts
    }

    /// Unresolved fragments nobody has claimed that may attach to `host`
    fn available_fragments(&self, checkpoint: &CheckPoint, host: &Generation) -> Vec<GenerationId> {
        let mut fragments: Vec<Arc<Generation>> = checkpoint
            .candidates()
            .filter(|candidate| matches!(candidate, Candidate::Unresolved(_)))
            .map(|candidate| candidate.generation().clone())
            .filter(|generation| {
                generation.is_fragment()
                    && checkpoint.is_unused(&generation.id())
                    && !checkpoint.is_attached(&generation.id())
                    && self.is_host_of(generation, host)
            })
            .collect();

        self.policy.sort(&mut fragments, |g| (g.version(), g.id()));
        fragments.iter().map(|g| g.id()).collect()
    }

    fn is_host_of(&self, fragment: &Generation, host: &Generation) -> bool {
        let Some(description) = fragment.fragment_host_description() else {
            return false;
        };
        if host.is_fragment() || !description.host_version_range().includes(host.version()) {
            return false;
        }

        let system_bundle = self.framework.system_bundle();
        let is_system_bundle = host.symbolic_name() == system_bundle;
        if fragment.kind() == GenerationKind::FrameworkExtension && !is_system_bundle {
            return false;
        }

        let name = description.host_symbolic_name();
        name == host.symbolic_name() || (name == SYSTEM_BUNDLE_ALIAS && is_system_bundle)
    }

    fn tick(&self) {
        self.steps.set(self.steps.get() + 1);
    }
}
