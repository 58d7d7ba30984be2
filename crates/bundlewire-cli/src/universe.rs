//! Module universe files.
//!
//! A universe is a JSON document listing installed modules by their manifest
//! headers:
//!
//! ```json
//! {
//!   "bundles": [
//!     { "id": 1, "headers": { "Bundle-SymbolicName": "org.acme.log", "Export-Package": "org.acme.log" } },
//!     { "id": 2, "headers": { "Bundle-SymbolicName": "org.acme.app", "Import-Package": "org.acme.log" } }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use bundlewire_resolver::{BundleManifest, Generation};
use bundlewire_version::VersionRange;

#[derive(Debug, Deserialize)]
pub struct UniverseFile {
    pub bundles: Vec<BundleEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BundleEntry {
    pub id: u64,
    #[serde(default)]
    pub generation: u32,
    pub headers: IndexMap<String, String>,
}

/// Installed generations in file order
pub struct Universe {
    pub generations: Vec<Arc<Generation>>,
}

impl Universe {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid universe file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: UniverseFile = serde_json::from_str(content)?;

        let mut seen = HashSet::new();
        let mut generations = Vec::with_capacity(file.bundles.len());
        for entry in file.bundles {
            if !seen.insert((entry.id, entry.generation)) {
                bail!("Duplicate bundle id {}.{}", entry.id, entry.generation);
            }
            let manifest = BundleManifest::from_headers(&entry.headers)
                .with_context(|| format!("Invalid manifest for bundle {}", entry.id))?;
            generations.push(Generation::new(entry.id, entry.generation, Arc::new(manifest)));
        }

        Ok(Self { generations })
    }

    /// Generations picked by `selector`, in file order
    pub fn select(&self, selector: &Selector) -> Vec<Arc<Generation>> {
        self.generations
            .iter()
            .filter(|g| selector.matches(g))
            .cloned()
            .collect()
    }
}

/// `NAME` or `NAME@RANGE`, e.g. `org.acme.app@[1.0,2.0)`
#[derive(Debug, Clone)]
pub struct Selector {
    pub symbolic_name: String,
    pub range: VersionRange,
}

impl Selector {
    pub fn matches(&self, generation: &Generation) -> bool {
        generation.symbolic_name() == self.symbolic_name && self.range.includes(generation.version())
    }
}

impl FromStr for Selector {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (name, range) = match value.split_once('@') {
            Some((name, range)) => (
                name,
                VersionRange::parse(range).with_context(|| format!("Invalid version range in \"{}\"", value))?,
            ),
            None => (value, VersionRange::default()),
        };

        if name.trim().is_empty() {
            bail!("Missing symbolic name in \"{}\"", value);
        }

        Ok(Self {
            symbolic_name: name.trim().to_string(),
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNIVERSE: &str = r#"{
        "bundles": [
            { "id": 1, "headers": { "Bundle-SymbolicName": "lib", "Bundle-Version": "1.0", "Export-Package": "org.lib" } },
            { "id": 2, "headers": { "Bundle-SymbolicName": "lib", "Bundle-Version": "2.0", "Export-Package": "org.lib" } },
            { "id": 3, "headers": { "Bundle-SymbolicName": "app", "Import-Package": "org.lib" } }
        ]
    }"#;

    #[test]
    fn test_parse_universe() {
        let universe = Universe::parse(UNIVERSE).unwrap();
        assert_eq!(universe.generations.len(), 3);
        assert_eq!(universe.generations[2].symbolic_name(), "app");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("universe.json");
        std::fs::write(&path, UNIVERSE).unwrap();

        let universe = Universe::load(&path).unwrap();
        assert_eq!(universe.generations.len(), 3);
    }

    #[test]
    fn test_duplicate_ids() {
        let err = Universe::parse(
            r#"{"bundles": [
                { "id": 1, "headers": { "Bundle-SymbolicName": "a" } },
                { "id": 1, "headers": { "Bundle-SymbolicName": "b" } }
            ]}"#,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("Duplicate bundle id"));
    }

    #[test]
    fn test_invalid_manifest() {
        let err = Universe::parse(r#"{"bundles": [{ "id": 1, "headers": { "Bundle-Version": "1.0" } }]}"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Invalid manifest for bundle 1"));
    }

    #[test]
    fn test_selector() {
        let universe = Universe::parse(UNIVERSE).unwrap();

        let all: Selector = "lib".parse().unwrap();
        assert_eq!(universe.select(&all).len(), 2);

        let newest: Selector = "lib@[2,3)".parse().unwrap();
        let selected = universe.select(&newest);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id().bundle_id, 2);

        assert!("@1.0".parse::<Selector>().is_err());
        assert!("lib@[2,1)".parse::<Selector>().is_err());
    }
}
