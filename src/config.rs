//! Project configuration (`stackpack.toml`) and legacy YAML migration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StackpackError, StackpackResult};
use crate::fs::atomic_write;
use crate::integrity::ContentHash;
use crate::lockfile::{Lockfile, StackState};
use crate::registry::ToolFlags;

pub const CONFIG_NAME: &str = "stackpack.toml";
pub const LEGACY_CONFIG_NAME: &str = "stackpack.yml";
pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_STACKS_DIR: &str = "ai-stacks";
pub const MANAGED_DIR: &str = "managed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    pub registry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_stacks_dir")]
    pub stacks_dir: String,
    #[serde(default)]
    pub stacks: Vec<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_stacks_dir() -> String {
    DEFAULT_STACKS_DIR.to_string()
}

impl Config {
    pub fn new(registry: String, project: Option<String>, branch: String) -> Self {
        Self {
            version: CONFIG_VERSION,
            registry,
            project,
            branch,
            stacks_dir: default_stacks_dir(),
            stacks: Vec::new(),
        }
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_NAME)
    }

    pub fn exists(root: &Path) -> bool {
        Self::path(root).exists()
    }

    /// Directory holding stack content, relative to the project root.
    pub fn stacks_root(&self, root: &Path) -> PathBuf {
        root.join(&self.stacks_dir)
    }

    pub fn validate(&self) -> StackpackResult<()> {
        if self.version < 1 {
            return Err(StackpackError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.registry.trim().is_empty() {
            return Err(StackpackError::Config(
                "'registry' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, root: &Path) -> StackpackResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StackpackError::Config(e.to_string()))?;
        atomic_write(&Self::path(root), content.as_bytes())?;
        Ok(())
    }
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub suggestion: Option<String>,
}

/// Result of loading project configuration.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
    /// True when the config was absorbed from a legacy `stackpack.yml`.
    pub migrated: bool,
}

/// Load `stackpack.toml`, or absorb a legacy `stackpack.yml` if that is all
/// the project has. The legacy file is left in place for the user to delete.
pub fn load(root: &Path) -> StackpackResult<LoadedConfig> {
    let path = Config::path(root);
    if path.exists() {
        let (config, warnings) = load_with_warnings(&path)?;
        config.validate()?;
        return Ok(LoadedConfig {
            config,
            warnings,
            migrated: false,
        });
    }

    if root.join(LEGACY_CONFIG_NAME).exists() {
        let config = migrate_legacy(root)?;
        config.validate()?;
        return Ok(LoadedConfig {
            config,
            warnings: Vec::new(),
            migrated: true,
        });
    }

    Err(StackpackError::ConfigNotFound)
}

/// Parse the TOML config, collecting unknown keys as warnings instead of
/// failing on them.
pub fn load_with_warnings(path: &Path) -> StackpackResult<(Config, Vec<ConfigWarning>)> {
    let content = std::fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| StackpackError::Config(format!("{}: {e}", path.display())))?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                suggestion: suggest_key(&key),
                key,
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Apply environment variable overrides (STACKPACK_* prefix).
pub fn with_env_overrides(mut config: Config) -> Config {
    if let Ok(registry) = std::env::var("STACKPACK_REGISTRY") {
        if !registry.is_empty() {
            config.registry = registry;
        }
    }
    if let Ok(project) = std::env::var("STACKPACK_PROJECT") {
        if !project.is_empty() {
            config.project = Some(project);
        }
    }
    if let Ok(branch) = std::env::var("STACKPACK_BRANCH") {
        if !branch.is_empty() {
            config.branch = branch;
        }
    }
    config
}

/// Registry token: `--token` flag beats `STACKPACK_TOKEN`. Never persisted.
pub fn resolve_token(flag: Option<String>) -> Option<String> {
    flag.or_else(|| {
        std::env::var("STACKPACK_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
    })
}

/// Legacy pre-1.0 YAML config, including the embedded resolved-stack state
/// that now lives in the lockfile.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(default)]
    registry: String,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    stacks: Vec<String>,
    #[serde(default)]
    resolved: BTreeMap<String, LegacyResolved>,
}

#[derive(Debug, Deserialize)]
struct LegacyResolved {
    version: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    dependency_of: Option<String>,
}

/// Absorb `stackpack.yml` into `stackpack.toml` + `stackpack.lock`.
fn migrate_legacy(root: &Path) -> StackpackResult<Config> {
    let content = std::fs::read_to_string(root.join(LEGACY_CONFIG_NAME))?;
    let legacy: LegacyConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| StackpackError::Config(format!("{LEGACY_CONFIG_NAME}: {e}")))?;

    let mut config = Config::new(
        legacy.registry,
        legacy.project,
        legacy.branch.unwrap_or_else(default_branch),
    );
    config.stacks = legacy.stacks;

    let mut lockfile = Lockfile::default();
    for (id, resolved) in legacy.resolved {
        let explicit = config.stacks.contains(&id);
        lockfile.stacks.insert(
            id,
            StackState {
                version: resolved.version,
                hash: ContentHash::new(&resolved.hash),
                files: resolved.files,
                file_hashes: BTreeMap::new(),
                tools: ToolFlags::default(),
                explicit,
                dependency_of: if explicit { None } else { resolved.dependency_of },
            },
        );
    }

    config.save(root)?;
    lockfile.save(root).map_err(StackpackError::Lockfile)?;
    Ok(config)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "version",
        "registry",
        "project",
        "branch",
        "stacks_dir",
        "stacks",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
