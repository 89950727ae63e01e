//! Lockfile: the locally recorded state of every installed stack.
//!
//! `stackpack.lock` is human-readable TOML with a sorted stacks table. It is
//! the source of truth for what is installed, at which version, and with
//! which content fingerprints.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fs::atomic_write;
use crate::integrity::ContentHash;
use crate::registry::ToolFlags;
use crate::resolver::Catalog;

pub const LOCKFILE_NAME: &str = "stackpack.lock";
pub const LOCKFILE_VERSION: u32 = 1;

/// Advisory lock taken by mutating commands, sibling to the lockfile.
const GUARD_NAME: &str = ".stackpack.lock";

#[derive(Error, Debug)]
pub enum LockfileError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unsupported lockfile version {found} (expected {LOCKFILE_VERSION}) - re-run 'stackpack init'")]
    VersionMismatch { found: u32 },

    #[error("failed to serialize lockfile: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Recorded state of one installed stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackState {
    pub version: String,
    pub hash: ContentHash,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub file_hashes: BTreeMap<String, ContentHash>,
    #[serde(default)]
    pub tools: ToolFlags,
    #[serde(default, skip_serializing_if = "is_false")]
    pub explicit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_of: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !b
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lockfile {
    pub version: u32,
    #[serde(default)]
    pub stacks: BTreeMap<String, StackState>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: LOCKFILE_VERSION,
            stacks: BTreeMap::new(),
        }
    }
}

impl Lockfile {
    pub fn path(root: &Path) -> PathBuf {
        root.join(LOCKFILE_NAME)
    }

    /// Load the lockfile from the project root. A missing file is an empty
    /// lockfile, not an error.
    pub fn load(root: &Path) -> Result<Self, LockfileError> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| LockfileError::Io {
            path: path.clone(),
            source,
        })?;
        let lockfile: Lockfile =
            toml::from_str(&content).map_err(|source| LockfileError::Parse {
                path: path.clone(),
                source,
            })?;

        if lockfile.version != LOCKFILE_VERSION {
            return Err(LockfileError::VersionMismatch {
                found: lockfile.version,
            });
        }
        Ok(lockfile)
    }

    /// Atomically write the lockfile back. Stack ids come out sorted because
    /// the table is a BTreeMap.
    pub fn save(&self, root: &Path) -> Result<(), LockfileError> {
        let content = toml::to_string_pretty(self)?;
        atomic_write(&Self::path(root), content.as_bytes()).map_err(|source| LockfileError::Io {
            path: Self::path(root),
            source,
        })
    }

    pub fn is_installed(&self, id: &str) -> bool {
        self.stacks.contains_key(id)
    }

    /// Dependency catalog reconstructed from recorded attribution edges.
    ///
    /// Each non-explicit stack contributes one edge from its recorded
    /// requester. Used as an offline fallback when the registry cannot be
    /// reached during removal.
    pub fn catalog(&self) -> Catalog {
        let mut depends: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in self.stacks.keys() {
            depends.entry(id.clone()).or_default();
        }
        for (id, state) in &self.stacks {
            if let Some(requester) = &state.dependency_of {
                depends.entry(requester.clone()).or_default().push(id.clone());
            }
        }
        depends.into_iter().collect()
    }
}

/// Exclusive advisory lock held across read-modify-write of project state.
/// Released on drop.
pub struct LockGuard {
    file: std::fs::File,
}

impl LockGuard {
    pub fn acquire(root: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(root.join(GUARD_NAME))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
