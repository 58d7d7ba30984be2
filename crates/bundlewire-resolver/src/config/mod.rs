//! Resolver configuration
//!
//! Values are merged from three sources, highest priority first:
//!
//! 1. Environment variables (`BUNDLEWIRE_*`)
//! 2. A JSON configuration file
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use bundlewire_resolver::config::ResolverConfig;
//! use std::path::Path;
//!
//! let config = ResolverConfig::build(Some(Path::new("bundlewire.json")), true).unwrap();
//! assert!(config.boot_delegation().matches("java.lang"));
//! ```

mod boot_delegation;
mod config;
mod source;

pub use boot_delegation::BootDelegation;
pub use config::ResolverConfig;
pub use source::{ConfigLoader, RawConfig};
