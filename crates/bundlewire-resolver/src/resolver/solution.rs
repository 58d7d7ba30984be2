use std::sync::{Arc, Weak};

use crate::generation::{Generation, State};
use crate::manifest::{ExportDescription, RequireDescription};
use super::candidate::{Candidate, CandidateWiring};
use super::checkpoint::CheckPoint;
use super::matching::visible_exports;

/// A package import wired to the generation that exports it
#[derive(Debug, Clone)]
pub struct Wire {
    pub package_name: String,
    pub export: Arc<ExportDescription>,
    pub exporter: Arc<Generation>,
}

impl From<CandidateWiring> for Wire {
    fn from(wiring: CandidateWiring) -> Self {
        Self {
            package_name: wiring.package_name,
            export: wiring.export,
            exporter: wiring.exporter,
        }
    }
}

/// A `Require-Bundle` entry together with every package it makes visible
#[derive(Debug, Clone)]
pub struct RequiredBundleWire {
    pub description: Arc<RequireDescription>,
    pub exporter: Arc<Generation>,
    pub reexport: bool,
    pub wires: Vec<Wire>,
}

/// The wiring of one module decided by a successful resolution.
///
/// Solutions are inert until [`Solution::apply`] is called. Applied wiring
/// refers to generations weakly, so keeping generations alive is up to the
/// framework that installed them.
#[derive(Debug, Clone)]
pub struct Solution {
    pub module_generation: Arc<Generation>,
    pub fragments: Vec<Arc<Generation>>,
    pub wires: Vec<Wire>,
    pub required_bundle_wires: Vec<RequiredBundleWire>,
}

impl Solution {
    pub fn wire(&self, package: &str) -> Option<&Wire> {
        self.wires.iter().find(|wire| wire.package_name == package)
    }

    pub fn required_bundle_wire(&self, symbolic_name: &str) -> Option<&RequiredBundleWire> {
        self.required_bundle_wires
            .iter()
            .find(|wire| wire.exporter.symbolic_name() == symbolic_name)
    }

    /// Store this wiring on the module and its fragments and mark them resolved
    pub fn apply(&self) {
        let wiring = Arc::new(AppliedWiring::new(self));
        for generation in std::iter::once(&self.module_generation).chain(&self.fragments) {
            generation.set_wiring(Some(wiring.clone()));
            if !generation.state().is_resolved() {
                generation.set_state(State::Resolved);
            }
        }
        log::debug!(
            "Applied wiring of {} ({} wires, {} fragments)",
            self.module_generation,
            self.wires.len(),
            self.fragments.len()
        );
    }

    /// Drop the wiring and return the module and its fragments to installed
    pub fn unapply(&self) {
        for generation in std::iter::once(&self.module_generation).chain(&self.fragments) {
            generation.set_wiring(None);
            generation.set_state(State::Installed);
        }
    }
}

/// A [`Solution`] as stored on the generations it was applied to
#[derive(Debug)]
pub(crate) struct AppliedWiring {
    module_generation: Weak<Generation>,
    fragments: Vec<Weak<Generation>>,
    wires: Vec<AppliedWire>,
    required_bundle_wires: Vec<AppliedRequiredWire>,
}

#[derive(Debug)]
struct AppliedWire {
    package_name: String,
    export: Arc<ExportDescription>,
    exporter: Weak<Generation>,
}

#[derive(Debug)]
struct AppliedRequiredWire {
    description: Arc<RequireDescription>,
    exporter: Weak<Generation>,
    reexport: bool,
    wires: Vec<AppliedWire>,
}

impl AppliedWire {
    fn new(wire: &Wire) -> Self {
        Self {
            package_name: wire.package_name.clone(),
            export: wire.export.clone(),
            exporter: Arc::downgrade(&wire.exporter),
        }
    }

    fn upgrade(&self) -> Option<Wire> {
        Some(Wire {
            package_name: self.package_name.clone(),
            export: self.export.clone(),
            exporter: self.exporter.upgrade()?,
        })
    }
}

impl AppliedWiring {
    fn new(solution: &Solution) -> Self {
        Self {
            module_generation: Arc::downgrade(&solution.module_generation),
            fragments: solution.fragments.iter().map(Arc::downgrade).collect(),
            wires: solution.wires.iter().map(AppliedWire::new).collect(),
            required_bundle_wires: solution
                .required_bundle_wires
                .iter()
                .map(|required| AppliedRequiredWire {
                    description: required.description.clone(),
                    exporter: Arc::downgrade(&required.exporter),
                    reexport: required.reexport,
                    wires: required.wires.iter().map(AppliedWire::new).collect(),
                })
                .collect(),
        }
    }

    /// The solution again, minus anything whose generation was dropped
    pub(crate) fn solution(&self) -> Option<Solution> {
        Some(Solution {
            module_generation: self.module_generation.upgrade()?,
            fragments: self.fragments.iter().filter_map(Weak::upgrade).collect(),
            wires: self.wires.iter().filter_map(AppliedWire::upgrade).collect(),
            required_bundle_wires: self
                .required_bundle_wires
                .iter()
                .filter_map(|required| {
                    Some(RequiredBundleWire {
                        description: required.description.clone(),
                        exporter: required.exporter.upgrade()?,
                        reexport: required.reexport,
                        wires: required.wires.iter().filter_map(AppliedWire::upgrade).collect(),
                    })
                })
                .collect(),
        })
    }
}

/// One solution per candidate the search bound and completed
pub(crate) fn extract_solutions(checkpoint: &CheckPoint) -> Vec<Solution> {
    checkpoint
        .resolved()
        .filter_map(|id| match checkpoint.candidate(id) {
            Some(Candidate::Bound(bound)) => Some(bound),
            _ => None,
        })
        .map(|bound| Solution {
            module_generation: bound.host().clone(),
            fragments: bound.fragments().to_vec(),
            wires: bound.wirings().values().cloned().map(Wire::from).collect(),
            required_bundle_wires: bound
                .required()
                .iter()
                .map(|required| RequiredBundleWire {
                    description: required.description.clone(),
                    exporter: required.provider.clone(),
                    reexport: required.description.is_reexport(),
                    wires: visible_exports(checkpoint, &required.provider)
                        .into_iter()
                        .map(Wire::from)
                        .collect(),
                })
                .collect(),
        })
        .collect()
}
