use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{ResolverError, Result};

/// Configuration values as they appear in a JSON file; absent keys keep the
/// lower priority value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_delegation: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_bundle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_lowest: Option<bool>,
}

/// Loads configuration from files and the environment
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get a `BUNDLEWIRE_*` environment variable, ignoring empty values
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Load configuration from a JSON file. A missing file yields an empty config.
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ResolverError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: RawConfig = serde_json::from_str(&contents)
            .map_err(|e| ResolverError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Configuration taken from environment variables
    pub fn load_environment(&self) -> Result<RawConfig> {
        let prefer_lowest = match self.get_env("BUNDLEWIRE_PREFER_LOWEST") {
            None => None,
            Some(value) => Some(parse_bool(&value).ok_or_else(|| {
                ResolverError::Config(format!("Invalid BUNDLEWIRE_PREFER_LOWEST value \"{}\"", value))
            })?),
        };

        Ok(RawConfig {
            boot_delegation: self.get_env("BUNDLEWIRE_BOOT_DELEGATION").map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            system_bundle: self.get_env("BUNDLEWIRE_SYSTEM_BUNDLE"),
            prefer_lowest,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_disabled() {
        let loader = ConfigLoader::new(false);
        assert_eq!(loader.get_env("PATH"), None);
        let raw = loader.load_environment().unwrap();
        assert!(raw.boot_delegation.is_none());
        assert!(raw.system_bundle.is_none());
        assert!(raw.prefer_lowest.is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let loader = ConfigLoader::new(false);
        let raw = loader.load_config_file("/nonexistent/bundlewire.json").unwrap();
        assert!(raw.boot_delegation.is_none());
    }

    #[test]
    fn test_unreadable_file_is_config_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let loader = ConfigLoader::new(false);

        // a directory exists but cannot be read as a file
        match loader.load_config_file(temp_dir.path()) {
            Err(ResolverError::Config(message)) => {
                assert!(message.starts_with("Failed to read"));
                assert!(message.contains(&temp_dir.path().display().to_string()));
            }
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("bundlewire.json");
        std::fs::write(&path, r#"{"prefer-lowest": "often"}"#).unwrap();

        match ConfigLoader::new(false).load_config_file(&path) {
            Err(ResolverError::Config(message)) => assert!(message.starts_with("Failed to parse")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
