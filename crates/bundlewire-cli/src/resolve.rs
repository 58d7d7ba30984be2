//! Resolve command - wire bundles of a universe file and print the result.

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use bundlewire_resolver::{
    Generation, Resolver, ResolverConfig, Solution, StaticFramework, State,
};

use crate::universe::{Selector, Universe};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Universe file listing the installed bundles
    pub universe: PathBuf,

    /// Bundle to resolve as NAME or NAME@RANGE (can be used multiple times, default: all)
    #[arg(short, long = "bundle", value_name = "SELECTOR")]
    pub bundles: Vec<Selector>,

    /// Resolver configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ignore BUNDLEWIRE_* environment variables
    #[arg(long)]
    pub no_env: bool,

    /// Output the wiring as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
struct Report {
    resolved: Vec<ModuleReport>,
    failed: Vec<FailureReport>,
}

#[derive(Debug, Serialize)]
struct ModuleReport {
    id: String,
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fragments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    wires: Vec<WireReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<RequiredReport>,
}

#[derive(Debug, Serialize)]
struct WireReport {
    package: String,
    version: String,
    exporter: String,
}

#[derive(Debug, Serialize)]
struct RequiredReport {
    bundle: String,
    reexport: bool,
    packages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FailureReport {
    id: String,
    name: String,
    error: String,
}

fn label(generation: &Generation) -> String {
    format!("{} {}", generation.symbolic_name(), generation.version())
}

impl From<&Solution> for ModuleReport {
    fn from(solution: &Solution) -> Self {
        let module = &solution.module_generation;
        Self {
            id: module.id().to_string(),
            name: module.symbolic_name().to_string(),
            version: module.version().to_string(),
            fragments: solution.fragments.iter().map(|f| label(f)).collect(),
            wires: solution
                .wires
                .iter()
                .map(|wire| WireReport {
                    package: wire.package_name.clone(),
                    version: wire.export.version().to_string(),
                    exporter: label(&wire.exporter),
                })
                .collect(),
            required: solution
                .required_bundle_wires
                .iter()
                .map(|required| RequiredReport {
                    bundle: label(&required.exporter),
                    reexport: required.reexport,
                    packages: required.wires.iter().map(|w| w.package_name.clone()).collect(),
                })
                .collect(),
        }
    }
}

pub fn execute(args: ResolveArgs) -> Result<i32> {
    let config = ResolverConfig::build(args.config.as_deref(), !args.no_env)
        .context("Failed to load resolver configuration")?;
    let universe = Universe::load(&args.universe)?;

    let targets = select_targets(&universe, &args.bundles)?;

    let resolver = Resolver::from_config(&config);
    resolver.start(Arc::new(StaticFramework::from_config(&config)))?;
    for generation in &universe.generations {
        resolver.added(generation.clone())?;
    }

    let mut report = Report::default();
    for target in &targets {
        // Pulled in by an earlier target
        if target.state() != State::Installed {
            log::debug!("Skipping {}, already {:?}", target, target.state());
            continue;
        }

        match resolver.resolve(target) {
            Ok(solutions) => {
                for solution in &solutions {
                    solution.apply();
                    report.resolved.push(ModuleReport::from(solution));
                }
            }
            Err(e) => report.failed.push(FailureReport {
                id: target.id().to_string(),
                name: target.symbolic_name().to_string(),
                error: e.to_string(),
            }),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.failed.is_empty() { 0 } else { 1 })
}

fn select_targets(universe: &Universe, selectors: &[Selector]) -> Result<Vec<Arc<Generation>>> {
    if selectors.is_empty() {
        return Ok(universe.generations.clone());
    }

    let mut targets: Vec<Arc<Generation>> = Vec::new();
    for selector in selectors {
        let selected = universe.select(selector);
        if selected.is_empty() {
            bail!(
                "No bundle matches {}@{}",
                selector.symbolic_name,
                selector.range
            );
        }
        for generation in selected {
            if !targets.iter().any(|t| Arc::ptr_eq(t, &generation)) {
                targets.push(generation);
            }
        }
    }
    Ok(targets)
}

fn print_report(report: &Report) {
    for module in &report.resolved {
        println!(
            "{} {} {} [{}]",
            style("✓").green(),
            style(&module.name).bold(),
            module.version,
            module.id
        );
        for fragment in &module.fragments {
            println!("    {} {}", style("fragment").dim(), fragment);
        }
        for required in &module.required {
            let visibility = if required.reexport { " (reexport)" } else { "" };
            println!(
                "    {} {}{}",
                style("requires").dim(),
                style(&required.bundle).cyan(),
                visibility
            );
        }
        for wire in &module.wires {
            println!(
                "    {} {} -> {}",
                wire.package,
                style(&wire.version).dim(),
                style(&wire.exporter).cyan()
            );
        }
    }

    for failure in &report.failed {
        eprintln!(
            "{} {} [{}]: {}",
            style("✗").red(),
            style(&failure.name).bold(),
            failure.id,
            failure.error
        );
    }

    if report.resolved.is_empty() && report.failed.is_empty() {
        println!("{}", style("Nothing to resolve").yellow());
    }
}
