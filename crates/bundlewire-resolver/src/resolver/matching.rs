use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::generation::{Generation, GenerationId};
use crate::manifest::{ExportDescription, RESERVED_MATCHING_KEYS};
use super::candidate::{exports_of, Bound, CandidateWiring, PackageImport};
use super::checkpoint::CheckPoint;

/// Whether `export`, declared by `exporter`, can satisfy `import`.
pub fn matches(import: &PackageImport, export: &ExportDescription, exporter: &Generation) -> bool {
    let description = &import.description;

    if !export.exports_package(&import.package_name) {
        return false;
    }

    if !description.version_range().includes(export.version()) {
        return false;
    }

    if let Some(symbolic_name) = description.bundle_symbolic_name() {
        if symbolic_name != exporter.symbolic_name() {
            return false;
        }
    }
    if let Some(range) = description.bundle_version_range() {
        if !range.includes(exporter.version()) {
            return false;
        }
    }

    // Arbitrary attributes only constrain exports that declare them
    for (key, value) in description.parameters().attributes() {
        if RESERVED_MATCHING_KEYS.contains(&key) {
            continue;
        }
        if let Some(exported) = export.parameters().attribute(key) {
            if exported != value {
                return false;
            }
        }
    }

    export.mandatory().all(|key| {
        match (description.parameters().attribute(key), export.parameters().attribute(key)) {
            (Some(imported), Some(exported)) => imported == exported,
            _ => false,
        }
    })
}

/// Wiring a package to `exporter` commits the importer to that exporter plus
/// everything its `uses` constraints pull in, transitively.
pub fn implied_constraints(
    checkpoint: &CheckPoint,
    package: &str,
    export: &Arc<ExportDescription>,
    exporter: &Arc<Generation>,
) -> Vec<CandidateWiring> {
    let mut implied = vec![CandidateWiring {
        package_name: package.to_string(),
        export: export.clone(),
        exporter: exporter.clone(),
    }];
    let mut visited = HashSet::new();
    visited.insert((exporter.id(), package.to_string()));
    collect_implied_constraints(checkpoint, export, exporter, &mut visited, &mut implied);
    implied
}

/// The closure of every wiring `bound` has accepted so far. A new wiring
/// has to agree with it as well as with the wirings of used candidates.
pub fn accepted_constraints(checkpoint: &CheckPoint, bound: &Bound) -> Vec<CandidateWiring> {
    bound
        .wirings()
        .values()
        .flat_map(|wiring| implied_constraints(checkpoint, &wiring.package_name, &wiring.export, &wiring.exporter))
        .collect()
}

/// Follow the `uses` list of `export`. Each used package resolves to the
/// owner's wiring for it, or to the owner's own export when it has none.
pub fn collect_implied_constraints(
    checkpoint: &CheckPoint,
    export: &ExportDescription,
    owner: &Arc<Generation>,
    visited: &mut HashSet<(GenerationId, String)>,
    implied: &mut Vec<CandidateWiring>,
) {
    for used in export.uses() {
        if !visited.insert((owner.id(), used.to_string())) {
            continue;
        }

        let target = wiring_of(checkpoint, owner, used).or_else(|| own_export(checkpoint, owner, used));

        if let Some(target) = target {
            let next_export = target.export.clone();
            let next_owner = target.exporter.clone();
            implied.push(target);
            collect_implied_constraints(checkpoint, &next_export, &next_owner, visited, implied);
        }
    }
}

/// A set of implied wirings is consistent when it names one exporter per
/// package and agrees with every wiring already committed by `used`
/// candidates.
pub fn is_consistent(checkpoint: &CheckPoint, implied: &[CandidateWiring]) -> bool {
    let mut exporters: HashMap<&str, GenerationId> = HashMap::new();
    for wiring in implied {
        match exporters.get(wiring.package_name.as_str()) {
            Some(existing) if *existing != wiring.exporter.id() => {
                log::trace!(
                    "Implied wirings disagree on {}: {} and {}",
                    wiring.package_name,
                    existing,
                    wiring.exporter.id()
                );
                return false;
            }
            _ => {
                exporters.insert(&wiring.package_name, wiring.exporter.id());
            }
        }
    }

    for id in checkpoint.used() {
        let Some(candidate) = checkpoint.candidate(id) else {
            continue;
        };
        for committed in candidate.wirings() {
            if let Some(exporter) = exporters.get(committed.package_name.as_str()) {
                if *exporter != committed.exporter.id() {
                    log::trace!(
                        "{} already wires {} to {}",
                        candidate.generation(),
                        committed.package_name,
                        committed.exporter
                    );
                    return false;
                }
            }
        }
    }

    true
}

/// Packages visible through a required bundle: its own exports plus, for
/// every bundle it re-exports, that bundle's visible packages.
pub fn visible_exports(checkpoint: &CheckPoint, provider: &Arc<Generation>) -> Vec<CandidateWiring> {
    let mut visited = HashSet::new();
    let mut visible = Vec::new();
    collect_visible_exports(checkpoint, provider, &mut visited, &mut visible);
    visible
}

fn collect_visible_exports(
    checkpoint: &CheckPoint,
    provider: &Arc<Generation>,
    visited: &mut HashSet<GenerationId>,
    visible: &mut Vec<CandidateWiring>,
) {
    if !visited.insert(provider.id()) {
        return;
    }

    let (exports, reexported) = match checkpoint.candidate(&provider.id()) {
        Some(candidate) => (
            candidate.exports().to_vec(),
            candidate
                .required()
                .iter()
                .filter(|r| r.description.is_reexport())
                .map(|r| r.provider.clone())
                .collect::<Vec<_>>(),
        ),
        None => (
            exports_of(provider),
            provider
                .required_bundle_wires()
                .into_iter()
                .filter(|wire| wire.reexport)
                .map(|wire| wire.exporter)
                .collect(),
        ),
    };

    for offer in exports {
        if visible.iter().any(|w| w.package_name == offer.package_name) {
            continue;
        }
        let exporter = offer.exporter(provider).clone();
        visible.push(CandidateWiring {
            package_name: offer.package_name,
            export: offer.export,
            exporter,
        });
    }

    for next in reexported {
        collect_visible_exports(checkpoint, &next, visited, visible);
    }
}

fn wiring_of(checkpoint: &CheckPoint, owner: &Arc<Generation>, package: &str) -> Option<CandidateWiring> {
    match checkpoint.candidate(&owner.id()) {
        Some(candidate) => candidate.wiring(package).cloned(),
        None => owner
            .wires()
            .into_iter()
            .find(|wire| wire.package_name == package)
            .map(|wire| CandidateWiring {
                package_name: wire.package_name,
                export: wire.export,
                exporter: wire.exporter,
            }),
    }
}

fn own_export(checkpoint: &CheckPoint, owner: &Arc<Generation>, package: &str) -> Option<CandidateWiring> {
    let offer = match checkpoint.candidate(&owner.id()) {
        Some(candidate) => candidate.export_for(package).cloned(),
        None => exports_of(owner).into_iter().find(|offer| offer.package_name == package),
    }?;
    Some(CandidateWiring {
        package_name: package.to_string(),
        exporter: offer.exporter(owner).clone(),
        export: offer.export,
    })
}
