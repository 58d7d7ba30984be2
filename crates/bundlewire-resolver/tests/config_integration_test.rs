/// Integration tests for resolver configuration
///
/// These tests verify that configuration files and environment variables
/// are merged on top of the defaults and reach the resolver.

use bundlewire_resolver::config::{ConfigLoader, ResolverConfig};
use bundlewire_resolver::{Framework, Policy, ResolverError, StaticFramework};
use std::env;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

// Tests touching BUNDLEWIRE_* variables must not interleave
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_config_defaults() {
    let config = ResolverConfig::default();

    assert_eq!(config.boot_delegation, vec!["java.*"]);
    assert_eq!(config.system_bundle, "system.bundle");
    assert!(!config.prefer_lowest);
}

#[test]
fn test_load_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bundlewire.json");
    fs::write(
        &config_file,
        r#"{
            "boot-delegation": ["java.*", "javax.xml.*", "sun.misc"],
            "system-bundle": "org.acme.framework",
            "prefer-lowest": true
        }"#,
    )
    .unwrap();

    let config = ResolverConfig::build(Some(config_file.as_path()), false).unwrap();

    assert_eq!(config.boot_delegation, vec!["java.*", "javax.xml.*", "sun.misc"]);
    assert_eq!(config.system_bundle, "org.acme.framework");
    assert!(config.prefer_lowest);

    let delegation = config.boot_delegation();
    assert!(delegation.matches("javax.xml.parsers"));
    assert!(delegation.matches("sun.misc"));
    assert!(!delegation.matches("sun.misc.internal"));
    assert!(!delegation.matches("javax.swing"));
}

#[test]
fn test_partial_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bundlewire.json");
    fs::write(&config_file, r#"{"prefer-lowest": true}"#).unwrap();

    let config = ResolverConfig::build(Some(config_file.as_path()), false).unwrap();

    assert_eq!(config.boot_delegation, vec!["java.*"]);
    assert_eq!(config.system_bundle, "system.bundle");
    assert!(config.prefer_lowest);
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("absent.json");

    let config = ResolverConfig::build(Some(config_file.as_path()), false).unwrap();
    assert_eq!(config, ResolverConfig::default());
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bundlewire.json");
    fs::write(&config_file, "{ not json").unwrap();

    let err = ResolverConfig::build(Some(config_file.as_path()), false).unwrap_err();
    assert!(matches!(err, ResolverError::Config(_)));
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bundlewire.json");
    fs::write(
        &config_file,
        r#"{"system-bundle": "from.file", "boot-delegation": ["java.*"]}"#,
    )
    .unwrap();

    env::set_var("BUNDLEWIRE_SYSTEM_BUNDLE", "from.env");
    env::set_var("BUNDLEWIRE_BOOT_DELEGATION", "java.*, org.w3c.*");
    env::set_var("BUNDLEWIRE_PREFER_LOWEST", "yes");

    let config = ResolverConfig::build(Some(config_file.as_path()), true);

    env::remove_var("BUNDLEWIRE_SYSTEM_BUNDLE");
    env::remove_var("BUNDLEWIRE_BOOT_DELEGATION");
    env::remove_var("BUNDLEWIRE_PREFER_LOWEST");

    let config = config.unwrap();
    assert_eq!(config.system_bundle, "from.env");
    assert_eq!(config.boot_delegation, vec!["java.*", "org.w3c.*"]);
    assert!(config.prefer_lowest);
}

#[test]
fn test_invalid_environment_value() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("BUNDLEWIRE_PREFER_LOWEST", "sometimes");

    let result = ConfigLoader::new(true).load_environment();

    env::remove_var("BUNDLEWIRE_PREFER_LOWEST");
    assert!(matches!(result.unwrap_err(), ResolverError::Config(_)));
}

#[test]
fn test_environment_ignored_when_disabled() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("BUNDLEWIRE_SYSTEM_BUNDLE", "from.env");

    let config = ResolverConfig::build(None, false);

    env::remove_var("BUNDLEWIRE_SYSTEM_BUNDLE");
    assert_eq!(config.unwrap().system_bundle, "system.bundle");
}

#[test]
fn test_config_reaches_framework_and_policy() {
    let config = ResolverConfig {
        boot_delegation: vec!["*".to_string()],
        system_bundle: "org.acme.framework".to_string(),
        prefer_lowest: true,
    };

    let framework = StaticFramework::from_config(&config);
    assert_eq!(framework.system_bundle(), "org.acme.framework");
    assert!(framework.boot_delegation().matches("anything.at.all"));
    assert!(Policy::from_config(&config).is_prefer_lowest());
}
