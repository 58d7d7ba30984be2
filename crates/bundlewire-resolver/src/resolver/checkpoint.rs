//! Immutable search states
//!
//! Every decision the search makes produces a new [`CheckPoint`]; the
//! previous one stays untouched so backtracking is simply dropping the newer
//! value. The collections are persistent (`im`), which keeps those copies
//! cheap.

use std::sync::Arc;

use im::{OrdMap, OrdSet, Vector};

use crate::error::IncompatibleError;
use crate::generation::{Generation, GenerationId};
use crate::manifest::{ExportDescription, FragmentAttachment, RequireDescription};
use super::candidate::{
    Bound, Candidate, CandidateWiring, PackageImport, RequiredCandidate, Resolved, Unresolved,
};
use super::matching::visible_exports;

#[derive(Debug, Clone)]
pub struct CheckPoint {
    candidates: OrdMap<GenerationId, Candidate>,
    /// Candidate whose requirements are being decided
    resolving: Option<GenerationId>,
    /// Bound candidates with every requirement decided, in completion order
    resolved: Vector<GenerationId>,
    /// Bound candidates waiting for their turn
    queue: Vector<GenerationId>,
    /// Providers and consumers taking part in the current solution
    used: OrdSet<GenerationId>,
    /// Candidates the solution has not touched
    unused: OrdSet<GenerationId>,
    singletons: OrdMap<String, GenerationId>,
    /// Fragment to host
    attached: OrdMap<GenerationId, GenerationId>,
}

impl CheckPoint {
    fn pool(canonical: &[Arc<Generation>]) -> Result<Self, IncompatibleError> {
        let mut checkpoint = CheckPoint {
            candidates: OrdMap::new(),
            resolving: None,
            resolved: Vector::new(),
            queue: Vector::new(),
            used: OrdSet::new(),
            unused: OrdSet::new(),
            singletons: OrdMap::new(),
            attached: OrdMap::new(),
        };

        for generation in canonical {
            let candidate = if generation.state().is_resolved() {
                // Resolved fragments live inside their host's candidate
                if generation.is_fragment() {
                    continue;
                }
                Candidate::Resolved(Resolved::new(generation))
            } else {
                Candidate::Unresolved(Unresolved::new(generation))
            };

            checkpoint.register_singleton(generation)?;
            checkpoint.unused.insert(generation.id());
            checkpoint.candidates.insert(generation.id(), candidate);
        }

        Ok(checkpoint)
    }

    /// Initial checkpoint for resolving `target` against `canonical`
    pub fn new(canonical: &[Arc<Generation>], target: &Arc<Generation>) -> Result<Self, IncompatibleError> {
        let mut checkpoint = Self::pool(canonical)?;
        let id = target.id();

        checkpoint.register_singleton(target)?;
        checkpoint.unused.remove(&id);
        if target.is_fragment() {
            checkpoint
                .candidates
                .insert(id, Candidate::Unresolved(Unresolved::new(target)));
        } else {
            checkpoint.candidates.insert(id, Candidate::Bound(Bound::new(target)));
            checkpoint.used.insert(id);
        }
        checkpoint.resolving = Some(id);

        Ok(checkpoint)
    }

    /// Initial checkpoint for wiring extra packages onto an already resolved host
    pub fn for_dynamic_import(
        canonical: &[Arc<Generation>],
        host: &Arc<Generation>,
        imports: Vec<PackageImport>,
    ) -> Result<Self, IncompatibleError> {
        let mut checkpoint = Self::pool(canonical)?;
        let id = host.id();

        let resolved = match checkpoint.candidates.get(&id) {
            Some(Candidate::Resolved(resolved)) => resolved.clone(),
            _ => Resolved::new(host),
        };
        let mut bound = Bound::from_resolved(&resolved);
        bound.set_imports(imports);

        checkpoint.candidates.insert(id, Candidate::Bound(bound));
        checkpoint.unused.remove(&id);
        checkpoint.used.insert(id);
        checkpoint.resolving = Some(id);

        Ok(checkpoint)
    }

    pub fn candidate(&self, id: &GenerationId) -> Option<&Candidate> {
        self.candidates.get(id)
    }

    pub fn generation(&self, id: &GenerationId) -> Option<Arc<Generation>> {
        self.candidates.get(id).map(|candidate| candidate.generation().clone())
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    pub fn resolving(&self) -> Option<GenerationId> {
        self.resolving
    }

    pub fn resolving_bound(&self) -> Option<&Bound> {
        self.resolving
            .and_then(|id| self.candidates.get(&id))
            .and_then(Candidate::as_bound)
    }

    pub fn resolved(&self) -> impl Iterator<Item = &GenerationId> {
        self.resolved.iter()
    }

    pub fn used(&self) -> impl Iterator<Item = &GenerationId> {
        self.used.iter()
    }

    pub fn unused(&self) -> impl Iterator<Item = &GenerationId> {
        self.unused.iter()
    }

    pub fn is_used(&self, id: &GenerationId) -> bool {
        self.used.contains(id)
    }

    pub fn is_unused(&self, id: &GenerationId) -> bool {
        self.unused.contains(id)
    }

    /// A bound candidate whose requirements have all been decided
    pub fn is_settled(&self, id: &GenerationId) -> bool {
        self.resolved.iter().any(|resolved| resolved == id)
    }

    pub fn host_of(&self, fragment: &GenerationId) -> Option<GenerationId> {
        self.attached.get(fragment).copied()
    }

    pub fn is_attached(&self, fragment: &GenerationId) -> bool {
        self.attached.contains_key(fragment)
    }

    /// The search is complete once nothing is queued or resolving
    pub fn is_done(&self) -> bool {
        self.queue.is_empty() && self.resolving.is_none()
    }

    pub fn next_import(&self) -> Option<PackageImport> {
        self.resolving_bound().and_then(|bound| bound.next_import().cloned())
    }

    pub fn next_require(&self) -> Option<Arc<RequireDescription>> {
        self.resolving_bound().and_then(|bound| bound.next_require().cloned())
    }

    /// Move the front of the queue into the resolving slot
    pub fn next_bundle(&mut self) -> bool {
        match self.queue.pop_front() {
            Some(id) => {
                self.resolving = Some(id);
                true
            }
            None => false,
        }
    }

    /// Mark the resolving candidate finished
    pub fn resolve_completed(&mut self) {
        if let Some(id) = self.resolving.take() {
            if matches!(self.candidates.get(&id), Some(Candidate::Bound(_))) && !self.is_settled(&id) {
                self.resolved.push_back(id);
            }
        }
    }

    /// Satisfy the pending require with an already resolved provider
    pub fn new_checkpoint_used(&self, provider: &GenerationId) -> Result<CheckPoint, IncompatibleError> {
        let mut next = self.clone();
        if next.unused.remove(provider).is_some() {
            next.used.insert(*provider);
        }
        next.accept_require(provider);
        Ok(next)
    }

    /// Satisfy the pending require with a provider bound by this search
    pub fn new_checkpoint_bound(&self, provider: &GenerationId) -> Result<CheckPoint, IncompatibleError> {
        let mut next = self.clone();
        next.accept_require(provider);
        Ok(next)
    }

    /// Satisfy the pending require with an unresolved provider, which joins
    /// the queue
    pub fn new_checkpoint_unbound(&self, provider: &GenerationId) -> Result<CheckPoint, IncompatibleError> {
        let mut next = self.clone();
        next.bind(provider)?;
        next.accept_require(provider);
        Ok(next)
    }

    pub fn skip_require(&self) -> CheckPoint {
        let mut next = self.clone();
        if let Some(bound) = next.resolving_bound_mut() {
            bound.pop_require();
        }
        next
    }

    /// Wire the pending import to `export` of `exporter`
    pub fn new_checkpoint_wire(
        &self,
        exporter: &Arc<Generation>,
        export: Arc<ExportDescription>,
    ) -> Result<CheckPoint, IncompatibleError> {
        let mut next = self.clone();
        let exporter_id = exporter.id();

        match next.candidates.get(&exporter_id) {
            Some(Candidate::Unresolved(_)) => next.bind(&exporter_id)?,
            Some(Candidate::Resolved(_)) => {
                if next.unused.remove(&exporter_id).is_some() {
                    next.used.insert(exporter_id);
                }
            }
            _ => {}
        }

        if let Some(bound) = next.resolving_bound_mut() {
            if let Some(import) = bound.pop_import() {
                bound.add_wiring(CandidateWiring {
                    package_name: import.package_name.clone(),
                    export,
                    exporter: exporter.clone(),
                })?;
                bound.remove_export(&import.package_name);
            }
        }

        Ok(next)
    }

    pub fn skip_import(&self) -> CheckPoint {
        let mut next = self.clone();
        if let Some(bound) = next.resolving_bound_mut() {
            bound.pop_import();
        }
        next
    }

    /// Attach the resolving fragment to `host`.
    ///
    /// A resolved or unresolved host is reopened and becomes the resolving
    /// candidate. A host bound by this search takes the fragment's
    /// requirements on board; if it already completed it is resolved again.
    pub fn attach_fragment(&self, fragment: &GenerationId, host: &GenerationId) -> Result<CheckPoint, IncompatibleError> {
        let mut next = self.clone();
        let (Some(fragment_generation), Some(host_candidate)) =
            (next.generation(fragment), next.candidates.get(host).cloned())
        else {
            return Ok(next);
        };

        check_attachment_policy(&fragment_generation, &host_candidate)?;

        match host_candidate {
            Candidate::Resolved(resolved) => {
                let mut bound = Bound::from_resolved(&resolved);
                bound.attach(&fragment_generation)?;
                next.candidates.insert(*host, Candidate::Bound(bound));
                next.unused.remove(host);
                next.used.insert(*host);
                next.resolving = Some(*host);
            }
            Candidate::Bound(mut bound) => {
                bound.attach(&fragment_generation)?;
                next.candidates.insert(*host, Candidate::Bound(bound));
                if next.is_settled(host) {
                    next.resolved.retain(|id| id != host);
                    next.resolving = Some(*host);
                } else {
                    next.resolving = None;
                }
            }
            Candidate::Unresolved(unresolved) => {
                let host_generation = unresolved.generation().clone();
                next.register_singleton(&host_generation)?;
                let mut bound = Bound::new(&host_generation);
                bound.attach(&fragment_generation)?;
                next.candidates.insert(*host, Candidate::Bound(bound));
                next.unused.remove(host);
                next.used.insert(*host);
                next.resolving = Some(*host);
            }
        }

        next.unused.remove(fragment);
        next.attached.insert(*fragment, *host);
        Ok(next)
    }

    /// Bind a set of unresolved fragments to the resolving host
    pub fn bind_fragments(&self, host: &GenerationId, fragments: &[GenerationId]) -> Result<CheckPoint, IncompatibleError> {
        let mut next = self.clone();
        let Some(Candidate::Bound(mut bound)) = next.candidates.get(host).cloned() else {
            return Ok(next);
        };
        let host_candidate = Candidate::Bound(bound.clone());

        for fragment in fragments {
            let Some(generation) = next.generation(fragment) else {
                continue;
            };
            check_attachment_policy(&generation, &host_candidate)?;
            bound.attach(&generation)?;
            next.unused.remove(fragment);
            next.attached.insert(*fragment, *host);
        }

        next.candidates.insert(*host, Candidate::Bound(bound));
        Ok(next)
    }

    fn resolving_bound_mut(&mut self) -> Option<&mut Bound> {
        let id = self.resolving?;
        match self.candidates.get_mut(&id) {
            Some(Candidate::Bound(bound)) => Some(bound),
            _ => None,
        }
    }

    fn accept_require(&mut self, provider: &GenerationId) {
        let Some(provider) = self.generation(provider) else {
            return;
        };
        let reexport = self
            .resolving_bound()
            .and_then(|bound| bound.next_require())
            .is_some_and(|description| description.is_reexport());
        let visible = if reexport { visible_exports(self, &provider) } else { Vec::new() };

        if let Some(bound) = self.resolving_bound_mut() {
            if let Some(description) = bound.pop_require() {
                bound.add_required(RequiredCandidate { description, provider }, &visible);
            }
        }
    }

    /// Turn an unresolved candidate into a queued bound one
    fn bind(&mut self, id: &GenerationId) -> Result<(), IncompatibleError> {
        let generation = match self.candidates.get(id) {
            Some(Candidate::Unresolved(unresolved)) => unresolved.generation().clone(),
            _ => return Ok(()),
        };

        self.register_singleton(&generation)?;
        self.candidates.insert(*id, Candidate::Bound(Bound::new(&generation)));
        self.unused.remove(id);
        self.used.insert(*id);
        self.queue.push_back(*id);
        Ok(())
    }

    fn register_singleton(&mut self, generation: &Generation) -> Result<(), IncompatibleError> {
        if !generation.is_singleton() {
            return Ok(());
        }

        match self.singletons.get(generation.symbolic_name()) {
            Some(existing) if *existing != generation.id() => Err(IncompatibleError::SingletonConflict {
                symbolic_name: generation.symbolic_name().to_string(),
                existing: *existing,
                conflicting: generation.id(),
            }),
            _ => {
                self.singletons
                    .insert(generation.symbolic_name().to_string(), generation.id());
                Ok(())
            }
        }
    }
}

fn check_attachment_policy(fragment: &Generation, host: &Candidate) -> Result<(), IncompatibleError> {
    let refused = match host.generation().archive_store().fragment_attachment() {
        FragmentAttachment::Always => None,
        FragmentAttachment::Never => Some("host does not accept fragments"),
        FragmentAttachment::ResolveTime => match host {
            Candidate::Resolved(_) => Some("host only accepts fragments while it resolves"),
            _ => None,
        },
    };

    match refused {
        Some(reason) => Err(IncompatibleError::FragmentAttachment {
            fragment: fragment.id(),
            host: host.id(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{
        BundleManifest, ExportDescription, FragmentDescription, ImportDescription, RequireDescription,
    };
    use bundlewire_version::{Version, VersionRange};

    fn generation(id: u64, manifest: BundleManifest) -> Arc<Generation> {
        Generation::new(id, 0, Arc::new(manifest))
    }

    fn exporter(id: u64, package: &str) -> Arc<Generation> {
        generation(
            id,
            BundleManifest::new(format!("exporter{}", id), Version::new(1, 0, 0))
                .with_export(ExportDescription::new([package], Version::new(1, 0, 0))),
        )
    }

    #[test]
    fn test_initial_checkpoint() {
        let target = generation(
            1,
            BundleManifest::new("a", Version::new(1, 0, 0)).with_import(ImportDescription::new(["p"])),
        );
        let provider = exporter(2, "p");
        let checkpoint = CheckPoint::new(&[target.clone(), provider.clone()], &target).unwrap();

        assert_eq!(checkpoint.resolving(), Some(target.id()));
        assert!(checkpoint.is_used(&target.id()));
        assert!(checkpoint.is_unused(&provider.id()));
        assert_eq!(checkpoint.next_import().unwrap().package_name, "p");
        assert!(!checkpoint.is_done());
    }

    #[test]
    fn test_singleton_conflict_in_pool() {
        let first = generation(1, BundleManifest::new("s", Version::new(1, 0, 0)).singleton());
        let second = generation(2, BundleManifest::new("s", Version::new(2, 0, 0)).singleton());

        let err = CheckPoint::new(&[first.clone(), second], &first).unwrap_err();
        assert!(matches!(err, IncompatibleError::SingletonConflict { .. }));
    }

    #[test]
    fn test_wire_binds_unresolved_exporter() {
        let target = generation(
            1,
            BundleManifest::new("a", Version::new(1, 0, 0)).with_import(ImportDescription::new(["p"])),
        );
        let provider = exporter(2, "p");
        let checkpoint = CheckPoint::new(&[target.clone(), provider.clone()], &target).unwrap();

        let export = provider.archive_store().export_descriptions()[0].clone();
        let next = checkpoint.new_checkpoint_wire(&provider, export).unwrap();

        assert!(next.is_used(&provider.id()));
        assert!(matches!(next.candidate(&provider.id()), Some(Candidate::Bound(_))));
        assert!(next.next_import().is_none());
        assert_eq!(
            next.resolving_bound().unwrap().wirings()["p"].exporter.id(),
            provider.id()
        );

        // the earlier checkpoint is untouched
        assert!(checkpoint.is_unused(&provider.id()));
        assert!(matches!(checkpoint.candidate(&provider.id()), Some(Candidate::Unresolved(_))));
        assert!(checkpoint.next_import().is_some());
    }

    #[test]
    fn test_duplicate_wiring() {
        let import = ImportDescription::new(["p"]);
        let target = generation(
            1,
            BundleManifest::new("a", Version::new(1, 0, 0))
                .with_import(import.clone())
                .with_import(import),
        );
        let provider = exporter(2, "p");
        let checkpoint = CheckPoint::new(&[target.clone(), provider.clone()], &target).unwrap();

        let export = provider.archive_store().export_descriptions()[0].clone();
        let once = checkpoint.new_checkpoint_wire(&provider, export.clone()).unwrap();
        let err = once.new_checkpoint_wire(&provider, export).unwrap_err();
        assert!(matches!(err, IncompatibleError::DuplicateWiring { .. }));
    }

    #[test]
    fn test_failed_wire_leaves_checkpoint_unchanged() {
        let import = ImportDescription::new(["p"]);
        let target = generation(
            1,
            BundleManifest::new("a", Version::new(1, 0, 0))
                .with_import(import.clone())
                .with_import(import),
        );
        let first = exporter(2, "p");
        let second = exporter(3, "p");
        let checkpoint =
            CheckPoint::new(&[target.clone(), first.clone(), second.clone()], &target).unwrap();

        let export = first.archive_store().export_descriptions()[0].clone();
        let once = checkpoint.new_checkpoint_wire(&first, export).unwrap();

        // binds the unresolved second exporter before the wiring is refused
        let export = second.archive_store().export_descriptions()[0].clone();
        let err = once.new_checkpoint_wire(&second, export).unwrap_err();
        assert!(matches!(err, IncompatibleError::DuplicateWiring { .. }));

        assert!(once.is_unused(&second.id()));
        assert!(!once.is_used(&second.id()));
        assert!(matches!(once.candidate(&second.id()), Some(Candidate::Unresolved(_))));
        assert_eq!(once.used().count(), 2);
        assert_eq!(once.resolving(), Some(target.id()));

        let bound = once.resolving_bound().unwrap();
        assert_eq!(bound.wirings().len(), 1);
        assert_eq!(bound.wirings()["p"].exporter.id(), first.id());
        assert_eq!(once.next_import().unwrap().package_name, "p");

        // the refused checkpoint can still be completed
        let mut done = once.skip_import();
        done.resolve_completed();
        assert!(done.next_bundle());
        assert_eq!(done.resolving(), Some(first.id()));
    }

    #[test]
    fn test_import_removes_own_export() {
        let target = generation(
            1,
            BundleManifest::new("a", Version::new(1, 0, 0))
                .with_export(ExportDescription::new(["p"], Version::new(1, 0, 0)))
                .with_import(ImportDescription::new(["p"])),
        );
        let provider = exporter(2, "p");
        let checkpoint = CheckPoint::new(&[target.clone(), provider.clone()], &target).unwrap();

        let export = provider.archive_store().export_descriptions()[0].clone();
        let next = checkpoint.new_checkpoint_wire(&provider, export).unwrap();
        assert!(next.candidate(&target.id()).unwrap().export_for("p").is_none());
        assert!(checkpoint.candidate(&target.id()).unwrap().export_for("p").is_some());
    }

    #[test]
    fn test_reexported_require_widens_exports() {
        let target = generation(
            1,
            BundleManifest::new("a", Version::new(1, 0, 0))
                .with_require(RequireDescription::new("exporter2").reexport())
                .with_require(RequireDescription::new("exporter3")),
        );
        let reexported = exporter(2, "p");
        let required = exporter(3, "q");
        let checkpoint =
            CheckPoint::new(&[target.clone(), reexported.clone(), required.clone()], &target).unwrap();

        let next = checkpoint
            .new_checkpoint_unbound(&reexported.id())
            .unwrap()
            .new_checkpoint_unbound(&required.id())
            .unwrap();

        let bound = next.resolving_bound().unwrap();
        assert_eq!(bound.required().len(), 2);
        let offer = bound.exports().iter().find(|offer| offer.package_name == "p").unwrap();
        assert_eq!(offer.exporter(&target).id(), reexported.id());
        assert!(next.candidate(&target.id()).unwrap().export_for("q").is_none());
        assert!(checkpoint.candidate(&target.id()).unwrap().export_for("p").is_none());
    }

    #[test]
    fn test_attach_fragment_to_unresolved_host() {
        let host = generation(1, BundleManifest::new("h", Version::new(1, 0, 0)));
        let fragment = generation(
            2,
            BundleManifest::new("h.nl", Version::new(1, 0, 0))
                .with_fragment_host(FragmentDescription::new("h", VersionRange::default()))
                .with_import(ImportDescription::new(["p"])),
        );
        let checkpoint = CheckPoint::new(&[host.clone(), fragment.clone()], &fragment).unwrap();

        let next = checkpoint.attach_fragment(&fragment.id(), &host.id()).unwrap();
        assert_eq!(next.resolving(), Some(host.id()));
        assert_eq!(next.host_of(&fragment.id()), Some(host.id()));
        assert_eq!(next.next_import().unwrap().package_name, "p");
        assert_eq!(next.resolving_bound().unwrap().fragments().len(), 1);
    }

    #[test]
    fn test_attach_refused_by_host() {
        let host = generation(
            1,
            BundleManifest::new("h", Version::new(1, 0, 0)).with_fragment_attachment(FragmentAttachment::Never),
        );
        let fragment = generation(
            2,
            BundleManifest::new("h.nl", Version::new(1, 0, 0))
                .with_fragment_host(FragmentDescription::new("h", VersionRange::default())),
        );
        let checkpoint = CheckPoint::new(&[host.clone(), fragment.clone()], &fragment).unwrap();

        let err = checkpoint.attach_fragment(&fragment.id(), &host.id()).unwrap_err();
        assert!(matches!(err, IncompatibleError::FragmentAttachment { .. }));

        assert_eq!(checkpoint.resolving(), Some(fragment.id()));
        assert!(checkpoint.is_unused(&host.id()));
        assert!(!checkpoint.is_attached(&fragment.id()));
        assert!(matches!(checkpoint.candidate(&host.id()), Some(Candidate::Unresolved(_))));
        assert!(matches!(checkpoint.candidate(&fragment.id()), Some(Candidate::Unresolved(_))));
    }

    #[test]
    fn test_failed_attach_to_bound_host_leaves_checkpoint_unchanged() {
        let host = generation(1, BundleManifest::new("h", Version::new(1, 0, 0)));
        let first = generation(
            2,
            BundleManifest::new("h.nl", Version::new(1, 0, 0))
                .with_fragment_host(FragmentDescription::new("h", VersionRange::default()))
                .with_import(ImportDescription::new(["p"])),
        );
        // same symbolic name as the first fragment
        let second = generation(
            3,
            BundleManifest::new("h.nl", Version::new(2, 0, 0))
                .with_fragment_host(FragmentDescription::new("h", VersionRange::default()))
                .with_import(ImportDescription::new(["q"])),
        );
        let checkpoint =
            CheckPoint::new(&[host.clone(), first.clone(), second.clone()], &host).unwrap();
        let with_first = checkpoint.bind_fragments(&host.id(), &[first.id()]).unwrap();

        assert!(with_first.attach_fragment(&second.id(), &host.id()).is_err());

        let bound = with_first.resolving_bound().unwrap();
        assert_eq!(bound.fragments().len(), 1);
        assert_eq!(bound.fragments()[0].id(), first.id());
        assert_eq!(with_first.next_import().unwrap().package_name, "p");
        assert!(with_first.is_unused(&second.id()));
        assert!(!with_first.is_attached(&second.id()));
        assert_eq!(with_first.host_of(&first.id()), Some(host.id()));
    }

    #[test]
    fn test_completion() {
        let target = generation(1, BundleManifest::new("a", Version::new(1, 0, 0)));
        let mut checkpoint = CheckPoint::new(&[target.clone()], &target).unwrap();

        checkpoint.resolve_completed();
        assert!(checkpoint.is_done());
        assert!(checkpoint.is_settled(&target.id()));
        assert!(!checkpoint.next_bundle());
    }
}
