//! Wire formats served by the registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resolver::Catalog;

/// Top-level registry index (`registry.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryIndex {
    pub version: u32,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stacks: BTreeMap<String, StackMeta>,
}

impl RegistryIndex {
    /// Dependency catalog for the resolver: id plus declared depends edges.
    pub fn catalog(&self) -> Catalog {
        self.stacks
            .iter()
            .map(|(id, meta)| (id.clone(), meta.depends.clone()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stacks.contains_key(id)
    }
}

/// Per-stack summary inside the index.
#[derive(Debug, Clone, Deserialize)]
pub struct StackMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub depends: Vec<String>,
}

/// Per-stack manifest (`<id>/stack.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct StackManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub depends: Vec<String>,
    pub files: Vec<String>,
    #[serde(default)]
    pub tools: ToolFlags,
}

/// Which assistant entry-point files a stack wants to be referenced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFlags {
    #[serde(default = "default_true")]
    pub claude_md: bool,
    #[serde(default = "default_true")]
    pub agents_md: bool,
    #[serde(default)]
    pub cursorrules: bool,
}

impl Default for ToolFlags {
    fn default() -> Self {
        Self {
            claude_md: true,
            agents_md: true,
            cursorrules: false,
        }
    }
}

fn default_true() -> bool {
    true
}
