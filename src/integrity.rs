//! Content integrity
//!
//! Tamper-evident hashing for materialized stacks and the per-stack
//! verification that decides whether on-disk content can still be trusted.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content hash value object.
///
/// Wraps a SHA-256 hex digest with the `sha256:` prefix so hashes are
/// self-describing wherever they end up (lockfile, registry index, output).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub const PREFIX: &'static str = "sha256:";

    /// Create from a raw hash string, with or without the prefix.
    pub fn new(raw: &str) -> Self {
        if raw.starts_with(Self::PREFIX) {
            Self(raw.to_string())
        } else {
            Self(format!("{}{}", Self::PREFIX, raw))
        }
    }

    pub fn from_bytes(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(format!("{}{:x}", Self::PREFIX, digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex part without the prefix.
    pub fn hex(&self) -> &str {
        self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
    }

    pub fn matches(&self, other: &ContentHash) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a single file's bytes.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let content = std::fs::read(path)?;
    Ok(ContentHash::from_bytes(&content))
}

/// Deterministic hash of every file under `root`.
///
/// Relative paths are normalized to forward slashes and sorted, then each
/// file contributes `path:<relative>\n` followed by its raw bytes. The
/// digest is therefore independent of enumeration and write order, and any
/// path or byte change produces a different digest.
pub fn hash_tree(root: &Path) -> io::Result<ContentHash> {
    let files = walk_files(root)?;

    let mut hasher = Sha256::new();
    for rel in &files {
        hasher.update(format!("path:{rel}\n"));
        hasher.update(std::fs::read(root.join(rel))?);
    }

    Ok(ContentHash(format!(
        "{}{:x}",
        ContentHash::PREFIX,
        hasher.finalize()
    )))
}

/// Per-file hashes for the declared files of a stack, keyed by relative path.
pub fn hash_files(
    root: &Path,
    files: &[String],
) -> io::Result<BTreeMap<String, ContentHash>> {
    let mut hashes = BTreeMap::new();
    for file in files {
        hashes.insert(file.clone(), hash_file(&root.join(file))?);
    }
    Ok(hashes)
}

/// Marker reported when tampering cannot be localized (no per-file hashes).
pub const DIRECTORY_MISMATCH: &str = "(directory mismatch)";

/// Outcome of verifying one stack's on-disk content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyResult {
    pub stack: String,
    pub ok: bool,
    pub missing: Vec<String>,
    pub tampered: Vec<String>,
}

/// Verify a stack directory against its recorded fingerprint.
///
/// Missing declared files short-circuit: they are reported without any hash
/// comparison, so absence is never conflated with tampering. Otherwise the
/// tree hash is compared, and on mismatch the damage is localized per file
/// when per-file hashes were recorded. Read-only; never touches the tree.
pub fn verify_stack(
    root: &Path,
    stack: &str,
    declared: &[String],
    expected: &ContentHash,
    file_hashes: &BTreeMap<String, ContentHash>,
) -> VerifyResult {
    let mut result = VerifyResult {
        stack: stack.to_string(),
        ok: true,
        ..Default::default()
    };

    for file in declared {
        if !root.join(file).exists() {
            result.missing.push(file.clone());
            result.ok = false;
        }
    }
    if !result.missing.is_empty() {
        return result;
    }

    let actual = match hash_tree(root) {
        Ok(hash) => hash,
        Err(_) => {
            result.ok = false;
            result.tampered.push("(hash computation failed)".to_string());
            return result;
        }
    };
    if actual.matches(expected) {
        return result;
    }

    result.ok = false;

    if file_hashes.is_empty() {
        result.tampered.push(DIRECTORY_MISMATCH.to_string());
        return result;
    }

    for file in declared {
        let Some(recorded) = file_hashes.get(file) else {
            continue;
        };
        match hash_file(&root.join(file)) {
            Ok(current) if current.matches(recorded) => {}
            _ => result.tampered.push(file.clone()),
        }
    }

    // Files on disk that the manifest never declared.
    let declared_set: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
    if let Ok(on_disk) = walk_files(root) {
        for rel in on_disk {
            if !declared_set.contains(rel.as_str()) {
                result.tampered.push(format!("{rel} (unexpected)"));
            }
        }
    }

    result
}

/// Relative paths of all files under `root`, forward-slashed and sorted.
fn walk_files(root: &Path) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::other(e.to_string()))?;
        files.push(rel.to_string_lossy().replace('\\', "/"));
    }

    files.sort();
    Ok(files)
}
