//! Remote registry access: wire types, HTTP client, in-process cache.

mod client;
mod types;

pub use client::{RegistryClient, RegistryError, MAX_BODY_BYTES};
pub use types::{RegistryIndex, StackManifest, StackMeta, ToolFlags};
