//! OSGi-style versioning for module wiring
//!
//! This crate provides parsing, ordering and interval matching for the
//! `major.minor.micro.qualifier` versions used by bundle manifests.

mod range;
mod version;

pub use range::VersionRange;
pub use version::{Version, VersionError};
