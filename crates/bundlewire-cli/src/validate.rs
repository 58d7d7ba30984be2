//! Validate command - check every manifest of a universe file.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::collections::HashMap;
use std::path::PathBuf;

use bundlewire_resolver::{ArchiveStore, BundleManifest};

use crate::universe::UniverseFile;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Universe file listing the installed bundles
    pub universe: PathBuf,

    /// Only print problems
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn execute(args: ValidateArgs) -> Result<i32> {
    let content = std::fs::read_to_string(&args.universe)
        .with_context(|| format!("Failed to read {}", args.universe.display()))?;
    let file: UniverseFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid universe file {}", args.universe.display()))?;

    let mut errors = 0;
    let mut singletons: HashMap<String, u64> = HashMap::new();

    for entry in &file.bundles {
        let manifest = match BundleManifest::from_headers(&entry.headers) {
            Ok(manifest) => manifest,
            Err(e) => {
                errors += 1;
                eprintln!("{} bundle {}: {}", style("✗").red(), entry.id, e);
                continue;
            }
        };

        if manifest.is_singleton() {
            if let Some(other) = singletons.insert(manifest.symbolic_name().to_string(), entry.id) {
                eprintln!(
                    "{} bundle {}: singleton {} is also installed as bundle {}",
                    style("!").yellow(),
                    entry.id,
                    manifest.symbolic_name(),
                    other
                );
            }
        }

        if !args.quiet {
            println!("{} {}", style("✓").green(), summarize(entry.id, &manifest));
        }
    }

    if errors > 0 {
        eprintln!("{} of {} manifests are invalid", errors, file.bundles.len());
        return Ok(1);
    }

    if !args.quiet {
        println!("{} manifests are valid", file.bundles.len());
    }
    Ok(0)
}

fn summarize(id: u64, manifest: &BundleManifest) -> String {
    let mut summary = format!(
        "{} {} [{}]",
        style(manifest.symbolic_name()).bold(),
        manifest.version(),
        id
    );

    if let Some(host) = manifest.fragment_host_description() {
        summary.push_str(&format!(
            " fragment of {} {}",
            host.host_symbolic_name(),
            host.host_version_range()
        ));
    }

    let counts = [
        ("exports", manifest.export_descriptions().len()),
        ("imports", manifest.import_descriptions().len()),
        ("requires", manifest.require_descriptions().len()),
        ("dynamic imports", manifest.dynamic_import_descriptions().len()),
    ];
    for (name, count) in counts {
        if count > 0 {
            summary.push_str(&format!(", {} {}", count, name));
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(content: &str) -> i32 {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("universe.json");
        std::fs::write(&path, content).unwrap();
        execute(ValidateArgs { universe: path, quiet: true }).unwrap()
    }

    #[test]
    fn test_valid_universe() {
        let code = run(
            r#"{"bundles": [
                { "id": 1, "headers": { "Bundle-SymbolicName": "lib", "Export-Package": "org.lib" } },
                { "id": 2, "headers": { "Bundle-SymbolicName": "lib.nl", "Fragment-Host": "lib" } }
            ]}"#,
        );
        assert_eq!(code, 0);
    }

    #[test]
    fn test_invalid_manifest_is_reported() {
        let code = run(
            r#"{"bundles": [
                { "id": 1, "headers": { "Bundle-SymbolicName": "lib" } },
                { "id": 2, "headers": { "Bundle-SymbolicName": "app", "Import-Package": "a, a" } }
            ]}"#,
        );
        assert_eq!(code, 1);
    }

    #[test]
    fn test_summarize() {
        let headers = [
            ("Bundle-SymbolicName", "lib.nl"),
            ("Bundle-Version", "1.2"),
            ("Fragment-Host", "lib"),
            ("Import-Package", "org.a, org.b"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let manifest = BundleManifest::from_headers(&headers).unwrap();

        let summary = summarize(7, &manifest);
        assert!(summary.contains("1.2.0 [7]"));
        assert!(summary.contains("fragment of lib"));
        assert!(summary.contains("2 imports"));
        assert!(!summary.contains("exports"));
    }
}
