pub mod config;
pub mod error;
pub mod generation;
pub mod manifest;
pub mod resolver;

pub use config::{BootDelegation, ConfigLoader, ResolverConfig};
pub use error::{IncompatibleError, ParseError, ResolverError, Result};
pub use generation::{ArchiveStore, Generation, GenerationId, GenerationKind, State};
pub use manifest::{
    BundleManifest, ExportDescription, ExtensionKind, FragmentAttachment, FragmentDescription,
    ImportDescription, Parameters, RequireDescription, Resolution, Visibility,
};
pub use resolver::{
    Framework, Policy, RequiredBundleWire, Resolver, Solution, StaticFramework, Wire,
};
pub use bundlewire_version::{Version, VersionRange};
