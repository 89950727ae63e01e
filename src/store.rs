//! Local stack store: materializing, cleaning up, and removing stack
//! directories under `<stacks_dir>/managed/`.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::config::{Config, MANAGED_DIR};
use crate::error::{StackpackError, StackpackResult};
use crate::fs::atomic_write;
use crate::integrity::{hash_files, hash_tree, ContentHash};
use crate::registry::{RegistryClient, RegistryError, StackManifest};

/// Source of stack file content. `RegistryClient` is the real one; tests
/// substitute an in-memory map.
pub trait FileSource {
    fn fetch_file(&self, stack: &str, path: &str) -> Result<Vec<u8>, RegistryError>;
}

impl FileSource for RegistryClient {
    fn fetch_file(&self, stack: &str, path: &str) -> Result<Vec<u8>, RegistryError> {
        self.download_file(stack, path)
    }
}

/// Content fingerprints recorded after a successful download.
#[derive(Debug)]
pub struct DownloadedStack {
    pub hash: ContentHash,
    pub file_hashes: BTreeMap<String, ContentHash>,
}

pub struct StackStore {
    stacks_root: PathBuf,
}

impl StackStore {
    pub fn new(project_root: &Path, config: &Config) -> Self {
        Self {
            stacks_root: config.stacks_root(project_root),
        }
    }

    /// The subtree owned by stackpack. Everything under it may be deleted
    /// and rewritten by sync.
    pub fn managed_dir(&self) -> PathBuf {
        self.stacks_root.join(MANAGED_DIR)
    }

    pub fn stack_dir(&self, id: &str) -> PathBuf {
        self.managed_dir().join(id)
    }

    pub fn is_materialized(&self, id: &str) -> bool {
        self.stack_dir(id).is_dir()
    }

    /// Replace the stack directory with freshly fetched manifest files, then
    /// fingerprint the result for the lockfile.
    pub fn download_stack(
        &self,
        source: &dyn FileSource,
        id: &str,
        manifest: &StackManifest,
    ) -> StackpackResult<DownloadedStack> {
        for file in &manifest.files {
            validate_rel_path(id, file)?;
        }

        let dir = self.stack_dir(id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;

        for file in &manifest.files {
            let content = source.fetch_file(id, file)?;
            atomic_write(&dir.join(file), &content)?;
        }

        Ok(DownloadedStack {
            hash: hash_tree(&dir)?,
            file_hashes: hash_files(&dir, &manifest.files)?,
        })
    }

    /// Delete every managed directory whose id is not in `keep`. Returns the
    /// removed ids, sorted.
    pub fn cleanup_stale(&self, keep: &BTreeSet<String>) -> StackpackResult<Vec<String>> {
        let managed = self.managed_dir();
        if !managed.is_dir() {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for entry in std::fs::read_dir(&managed)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !keep.contains(&name) {
                std::fs::remove_dir_all(entry.path())?;
                removed.push(name);
            }
        }

        removed.sort();
        Ok(removed)
    }

    /// Delete one stack directory. Already gone is fine.
    pub fn remove_stack(&self, id: &str) -> io::Result<()> {
        let dir = self.stack_dir(id);
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Number of files currently materialized under `managed/`.
    pub fn file_count(&self) -> usize {
        let mut count = 0;
        let walker = ignore::WalkBuilder::new(self.managed_dir())
            .standard_filters(false)
            .hidden(false)
            .build();
        for entry in walker.flatten() {
            if entry.file_type().is_some_and(|t| t.is_file()) {
                count += 1;
            }
        }
        count
    }
}

/// Reject manifest paths that would land outside the stack directory.
fn validate_rel_path(stack: &str, rel: &str) -> StackpackResult<()> {
    let path = Path::new(rel);
    let escapes = rel.is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(StackpackError::UnsafePath {
            stack: stack.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
