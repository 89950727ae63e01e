//! Error types for stackpack.
//!
//! Module-level errors (`ResolveError`, `RegistryError`, `LockfileError`)
//! convert into this top-level type at the command boundary, where they are
//! mapped to process exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::lockfile::LockfileError;
use crate::registry::RegistryError;
use crate::resolver::ResolveError;

/// Result type alias for stackpack operations
pub type StackpackResult<T> = Result<T, StackpackError>;

/// Top-level error type for stackpack operations
#[derive(Error, Debug)]
pub enum StackpackError {
    /// Configuration file problem (missing keys, bad values, parse failure)
    #[error("configuration error: {0}")]
    Config(String),

    /// No stackpack.toml found in the working directory
    #[error("no stackpack.toml found - run 'stackpack init' first")]
    ConfigNotFound,

    /// Dependency resolution failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Registry communication failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Lockfile problem
    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    /// Stack is not installed locally
    #[error("stack '{stack}' is not installed")]
    NotInstalled { stack: String },

    /// A manifest declared a file path that would escape the stack directory
    #[error("unsafe file path '{}' in stack '{stack}'", path.display())]
    UnsafePath { stack: String, path: PathBuf },

    /// Invalid command usage (unknown stack name, bad argument)
    #[error("{0}")]
    Usage(String),

    /// One or more stacks failed content verification
    #[error("verification failed for {count} stack(s)")]
    VerificationFailed { count: usize },

    /// Operation cancelled at an interactive prompt
    #[error("aborted")]
    Aborted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackpackError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::ConfigNotFound | Self::Lockfile(_) => 2,
            Self::Registry(_) => 3,
            Self::Usage(_) | Self::NotInstalled { .. } | Self::Resolve(_) => 4,
            Self::VerificationFailed { .. } => 5,
            Self::UnsafePath { .. } | Self::Aborted | Self::Io(_) => 1,
        }
    }
}
