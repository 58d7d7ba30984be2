use thiserror::Error;

use bundlewire_version::VersionError;

use crate::generation::GenerationId;

/// Errors raised while turning manifest headers into descriptions.
///
/// These surface when a module is installed, before the resolver sees it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing required header {0}")]
    MissingHeader(&'static str),

    #[error("Malformed {header} header: {reason}")]
    InvalidHeader { header: String, reason: String },

    #[error("Invalid value \"{value}\" for directive {directive}")]
    InvalidDirective { directive: String, value: String },

    #[error("Package {package} declares version {version} but specification-version {legacy}")]
    VersionMismatch {
        package: String,
        version: String,
        legacy: String,
    },

    #[error("Export of {package} may not specify the {attribute} attribute")]
    ReservedAttribute { package: String, attribute: String },

    #[error("Package {0} is imported more than once")]
    DuplicateImport(String),

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// A specific combination of candidates that can never be wired together.
///
/// The search recovers from these by trying the next combination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IncompatibleError {
    #[error("Singleton {symbolic_name} is already provided by {existing}, cannot also use {conflicting}")]
    SingletonConflict {
        symbolic_name: String,
        existing: GenerationId,
        conflicting: GenerationId,
    },

    #[error("Fragment {fragment} cannot attach to {host}: {reason}")]
    FragmentAttachment {
        fragment: GenerationId,
        host: GenerationId,
        reason: String,
    },

    #[error("{module} already has a wiring for package {package}")]
    DuplicateWiring { module: GenerationId, package: String },
}

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Illegal resolver state: {0}")]
    IllegalState(String),

    #[error("Generation {0} is not tracked by this resolver")]
    UnknownGeneration(GenerationId),

    #[error("Could not resolve {module}: no consistent wiring exists")]
    NoSolution { module: String },

    #[error(transparent)]
    Incompatible(#[from] IncompatibleError),

    #[error("Invalid manifest: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ResolverError>;
