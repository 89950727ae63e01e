//! stackpack - dependency-resolving installer for AI instruction stacks.
//!
//! Teams publish named, versioned bundles of instruction files ("stacks") to
//! a remote registry; stackpack resolves their dependency graph, downloads
//! them into a managed directory, fingerprints the content for tamper
//! detection, and wires the installed stacks into assistant entry-point
//! files (`CLAUDE.md`, `AGENTS.md`, `.cursorrules`).

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fs;
pub mod inject;
pub mod integrity;
pub mod lockfile;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod ui;

// Re-exports for convenience
pub use config::Config;
pub use error::{StackpackError, StackpackResult};
pub use integrity::{hash_tree, verify_stack, ContentHash, VerifyResult};
pub use lockfile::{Lockfile, StackState};
pub use registry::{RegistryClient, RegistryIndex, StackManifest};
pub use resolver::{resolve, resolve_removal, Catalog, ResolveError, Resolution};
