use std::path::Path;

use super::boot_delegation::BootDelegation;
use super::source::{ConfigLoader, RawConfig};
use crate::error::Result;

pub const DEFAULT_SYSTEM_BUNDLE: &str = "system.bundle";

/// Settings consulted by the resolver engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Raw boot delegation entries, e.g. `java.*`
    pub boot_delegation: Vec<String>,
    /// Symbolic name of the framework's own module; framework extensions attach to it
    pub system_bundle: String,
    /// Try the lowest matching version first instead of the highest
    pub prefer_lowest: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            boot_delegation: vec!["java.*".to_string()],
            system_bundle: DEFAULT_SYSTEM_BUNDLE.to_string(),
            prefer_lowest: false,
        }
    }
}

impl ResolverConfig {
    /// Build the configuration from defaults, an optional JSON file and,
    /// when `use_environment` is set, `BUNDLEWIRE_*` variables.
    pub fn build(config_file: Option<&Path>, use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);
        let mut config = ResolverConfig::default();

        if let Some(path) = config_file {
            log::debug!("Loading resolver configuration from {}", path.display());
            config.merge(loader.load_config_file(path)?);
        }
        config.merge(loader.load_environment()?);

        Ok(config)
    }

    /// Defaults overlaid with a JSON file only
    pub fn load(path: &Path) -> Result<Self> {
        Self::build(Some(path), false)
    }

    /// Overlay every value present in `raw`
    pub fn merge(&mut self, raw: RawConfig) {
        if let Some(boot_delegation) = raw.boot_delegation {
            self.boot_delegation = boot_delegation;
        }
        if let Some(system_bundle) = raw.system_bundle {
            self.system_bundle = system_bundle;
        }
        if let Some(prefer_lowest) = raw.prefer_lowest {
            self.prefer_lowest = prefer_lowest;
        }
    }

    pub fn boot_delegation(&self) -> BootDelegation {
        BootDelegation::new(&self.boot_delegation)
    }
}
