//! Command implementations behind the CLI.

pub mod add;
pub mod doctor;
pub mod init;
pub mod list;
pub mod outdated;
pub mod remove;
pub mod search;
pub mod sync;
pub mod verify;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::error::StackpackResult;
use crate::inject;
use crate::integrity::verify_stack;
use crate::lockfile::{Lockfile, StackState};
use crate::registry::{RegistryClient, RegistryIndex};
use crate::resolver::Resolution;
use crate::store::StackStore;
use crate::ui::Ui;

/// Shared command context: project root, terminal, and the global flag
/// overrides that beat both config file and environment.
pub struct Context {
    pub root: PathBuf,
    pub ui: Ui,
    pub registry: Option<String>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub token: Option<String>,
}

impl Context {
    /// Load and validate project config, layering environment and flag
    /// overrides on top. Warnings and migration hints go to the terminal.
    pub fn load_config(&self) -> StackpackResult<Config> {
        let loaded = config::load(&self.root)?;
        for warning in &loaded.warnings {
            match &warning.suggestion {
                Some(suggestion) => self.ui.warn(&format!(
                    "unknown config key '{}' (did you mean '{suggestion}'?)",
                    warning.key
                )),
                None => self
                    .ui
                    .warn(&format!("unknown config key '{}'", warning.key)),
            }
        }
        if loaded.migrated {
            self.ui.info(&format!(
                "migrated legacy {} to {} - you can delete the old file",
                config::LEGACY_CONFIG_NAME,
                config::CONFIG_NAME
            ));
        }

        let config = self.apply_overrides(config::with_env_overrides(loaded.config));
        config.validate()?;
        Ok(config)
    }

    /// Flag overrides applied to an already-loaded config.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(registry) = &self.registry {
            config.registry = registry.clone();
        }
        if let Some(project) = &self.project {
            config.project = Some(project.clone());
        }
        if let Some(branch) = &self.branch {
            config.branch = branch.clone();
        }
        config
    }

    pub fn token(&self) -> Option<String> {
        config::resolve_token(self.token.clone())
    }

    pub fn client(&self, config: &Config) -> RegistryClient {
        RegistryClient::new(
            &config.registry,
            config.project.as_deref(),
            &config.branch,
            self.token().as_deref(),
        )
    }
}

/// What a materialization pass did, for reporting.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// (id, old version, new version)
    pub updated: Vec<(String, String, String)>,
    pub installed: Vec<String>,
    pub unchanged: Vec<String>,
    pub cleaned: Vec<String>,
}

/// Bring the managed tree in line with a resolution: download what is new or
/// changed, keep what still verifies, drop what is no longer needed, and
/// refresh attribution in the lockfile. Shared by init, sync, and add.
pub fn materialize(
    ctx: &Context,
    config: &Config,
    client: &mut RegistryClient,
    index: &RegistryIndex,
    resolution: &Resolution,
    lockfile: &mut Lockfile,
) -> StackpackResult<SyncOutcome> {
    let store = StackStore::new(&ctx.root, config);
    let mut outcome = SyncOutcome::default();

    for id in &resolution.order {
        let explicit = resolution.is_explicit(id);
        let dependency_of = resolution.dependency_of.get(id).cloned();

        let registry_version = index.stacks.get(id).map(|meta| meta.version.clone());
        let current = lockfile.stacks.get(id);

        let intact = match (current, &registry_version) {
            (Some(state), Some(version)) if state.version == *version => {
                store.is_materialized(id)
                    && verify_stack(
                        &store.stack_dir(id),
                        id,
                        &state.files,
                        &state.hash,
                        &state.file_hashes,
                    )
                    .ok
            }
            _ => false,
        };

        if intact {
            ctx.ui.debug(&format!("{id}: up to date, keeping files"));
            if let Some(state) = lockfile.stacks.get_mut(id) {
                state.explicit = explicit;
                state.dependency_of = if explicit { None } else { dependency_of };
            }
            outcome.unchanged.push(id.clone());
            continue;
        }

        let manifest = client.fetch_manifest(id)?;
        ctx.ui.debug(&format!(
            "{id}: downloading version {} ({} files)",
            manifest.version,
            manifest.files.len()
        ));
        let downloaded = store.download_stack(client, id, &manifest)?;

        let previous_version = current.map(|state| state.version.clone());
        lockfile.stacks.insert(
            id.clone(),
            StackState {
                version: manifest.version.clone(),
                hash: downloaded.hash,
                files: manifest.files.clone(),
                file_hashes: downloaded.file_hashes,
                tools: manifest.tools.clone(),
                explicit,
                dependency_of: if explicit { None } else { dependency_of },
            },
        );

        match previous_version {
            // Same version means the content failed verification and was
            // re-fetched; still an update from the user's point of view.
            Some(old) => outcome.updated.push((id.clone(), old, manifest.version)),
            None => outcome.installed.push(id.clone()),
        }
    }

    let keep = resolution.needed();
    outcome.cleaned = store.cleanup_stale(&keep)?;
    lockfile.stacks.retain(|id, _| keep.contains(id));

    inject::inject_all(&ctx.root, &config.stacks_dir, &resolution.order, lockfile)?;
    Ok(outcome)
}

/// Group index entries by category for `list`.
pub fn by_category(index: &RegistryIndex) -> BTreeMap<String, Vec<&String>> {
    let mut groups: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for (id, meta) in &index.stacks {
        let category = if meta.category.is_empty() {
            "other".to_string()
        } else {
            meta.category.clone()
        };
        groups.entry(category).or_default().push(id);
    }
    groups
}
