//! `stackpack doctor` - diagnose the project setup.

use std::time::Duration;

use crate::commands::Context;
use crate::config;
use crate::error::{StackpackError, StackpackResult};
use crate::inject;
use crate::integrity::verify_stack;
use crate::lockfile::Lockfile;
use crate::registry::RegistryClient;
use crate::store::StackStore;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(ctx: &Context) -> StackpackResult<()> {
    let mut problems = 0usize;

    let config = match ctx.load_config() {
        Ok(config) => {
            ctx.ui
                .success(&format!("{} found and valid", config::CONFIG_NAME));
            config
        }
        Err(StackpackError::ConfigNotFound) => {
            ctx.ui.error(&format!(
                "{} not found - run 'stackpack init'",
                config::CONFIG_NAME
            ));
            return Err(StackpackError::ConfigNotFound);
        }
        Err(e) => {
            ctx.ui.error(&format!("config: {e}"));
            return Err(e);
        }
    };

    let lockfile = match Lockfile::load(&ctx.root) {
        Ok(lockfile) => {
            if lockfile.stacks.is_empty() {
                ctx.ui.warn("lockfile empty - run 'stackpack sync'");
            } else {
                ctx.ui.success(&format!(
                    "lockfile present ({} stack(s))",
                    lockfile.stacks.len()
                ));
            }
            lockfile
        }
        Err(e) => {
            ctx.ui.error(&format!("lockfile: {e}"));
            problems += 1;
            Lockfile::default()
        }
    };

    let mut probe = RegistryClient::with_timeout(
        &config.registry,
        config.project.as_deref(),
        &config.branch,
        ctx.token().as_deref(),
        PROBE_TIMEOUT,
    );
    match probe.fetch_index() {
        Ok(index) => ctx.ui.success(&format!(
            "registry reachable ({} stack(s) available)",
            index.stacks.len()
        )),
        Err(e) => ctx.ui.warn(&format!("registry unreachable: {e}")),
    }

    let store = StackStore::new(&ctx.root, &config);
    if store.managed_dir().is_dir() {
        ctx.ui.success(&format!(
            "{}/{} exists ({} file(s))",
            config.stacks_dir,
            config::MANAGED_DIR,
            store.file_count()
        ));
    } else if lockfile.stacks.is_empty() {
        ctx.ui.warn(&format!(
            "{}/{} does not exist yet",
            config.stacks_dir,
            config::MANAGED_DIR
        ));
    } else {
        ctx.ui.error(&format!(
            "{}/{} missing but the lockfile records stacks",
            config.stacks_dir,
            config::MANAGED_DIR
        ));
        problems += 1;
    }

    for entry in inject::ENTRY_POINTS {
        let wanted = lockfile
            .stacks
            .values()
            .any(|state| inject::entry_points(&state.tools).contains(&entry));
        if !wanted {
            continue;
        }
        if inject::has_block(&ctx.root.join(entry)) {
            ctx.ui.success(&format!("{entry}: managed block present"));
        } else {
            ctx.ui.error(&format!("{entry}: managed block missing"));
            problems += 1;
        }
    }

    let mut bad_stacks = 0usize;
    for (id, state) in &lockfile.stacks {
        let result = verify_stack(
            &store.stack_dir(id),
            id,
            &state.files,
            &state.hash,
            &state.file_hashes,
        );
        if !result.ok {
            bad_stacks += 1;
        }
    }
    if bad_stacks == 0 {
        if !lockfile.stacks.is_empty() {
            ctx.ui
                .success(&format!("content verified ({} stack(s))", lockfile.stacks.len()));
        }
    } else {
        ctx.ui.error(&format!(
            "{bad_stacks} stack(s) failed verification - run 'stackpack verify' for details"
        ));
        problems += 1;
    }

    if problems == 0 {
        ctx.ui.success("everything looks good");
        Ok(())
    } else {
        Err(StackpackError::VerificationFailed { count: problems })
    }
}
