//! `stackpack remove` - remove explicit stacks and their orphaned
//! dependencies.

use std::collections::BTreeSet;

use crate::commands::Context;
use crate::error::{StackpackError, StackpackResult};
use crate::inject;
use crate::lockfile::{LockGuard, Lockfile};
use crate::resolver::{resolve, resolve_removal, Catalog};
use crate::store::StackStore;

pub fn run(ctx: &Context, stacks: Vec<String>, auto_orphans: bool) -> StackpackResult<()> {
    let mut config = ctx.load_config()?;

    let _guard = LockGuard::acquire(&ctx.root)?;
    let mut lockfile = Lockfile::load(&ctx.root)?;
    if lockfile.stacks.is_empty() {
        return Err(StackpackError::Usage(
            "nothing is installed - run 'stackpack sync' first".to_string(),
        ));
    }

    for id in &stacks {
        if !config.stacks.contains(id) {
            return Err(StackpackError::Usage(format!(
                "'{id}' is not an explicitly installed stack"
            )));
        }
    }

    // Prefer the live catalog; fall back to attribution edges recorded in
    // the lockfile when the registry cannot be reached.
    let catalog = match ctx.client(&config).fetch_index() {
        Ok(index) => index.catalog(),
        Err(e) => {
            ctx.ui
                .warn(&format!("registry unreachable, using lockfile state: {e}"));
            lockfile.catalog()
        }
    };

    let orphans = resolve_removal(&catalog, &config.stacks, &stacks);
    let mut removing: BTreeSet<String> = stacks.iter().cloned().collect();
    if !orphans.is_empty() {
        let remove_orphans = if auto_orphans || !ctx.ui.is_interactive() {
            true
        } else {
            ctx.ui.confirm(
                &format!(
                    "Also remove {} orphaned dependenc{} ({})?",
                    orphans.len(),
                    if orphans.len() == 1 { "y" } else { "ies" },
                    orphans.join(", ")
                ),
                true,
            )?
        };
        if remove_orphans {
            removing.extend(orphans);
        }
    }

    let store = StackStore::new(&ctx.root, &config);
    for id in &removing {
        store.remove_stack(id)?;
        lockfile.stacks.remove(id);
    }
    config.stacks.retain(|id| !removing.contains(id));

    if config.stacks.is_empty() {
        for entry in inject::ENTRY_POINTS {
            inject::clear_file(&ctx.root.join(entry))?;
        }
    } else {
        refresh_attribution(ctx, &catalog, &config.stacks, &mut lockfile, &config.stacks_dir)?;
    }

    config.save(&ctx.root)?;
    lockfile.save(&ctx.root)?;

    ctx.ui.success(&format!(
        "removed {} stack(s): {}",
        removing.len(),
        removing.iter().cloned().collect::<Vec<_>>().join(", ")
    ));
    Ok(())
}

/// Re-resolve the remaining stacks to refresh explicit flags and dependency
/// attribution, then re-render the marker blocks. Resolution failure against
/// a stale catalog is survivable; the next sync fixes attribution.
fn refresh_attribution(
    ctx: &Context,
    catalog: &Catalog,
    remaining: &[String],
    lockfile: &mut Lockfile,
    stacks_dir: &str,
) -> StackpackResult<()> {
    match resolve(catalog, remaining) {
        Ok(resolution) => {
            for id in &resolution.order {
                if let Some(state) = lockfile.stacks.get_mut(id) {
                    state.explicit = resolution.is_explicit(id);
                    state.dependency_of = if state.explicit {
                        None
                    } else {
                        resolution.dependency_of.get(id).cloned()
                    };
                }
            }
            inject::inject_all(&ctx.root, stacks_dir, &resolution.order, lockfile)?;
        }
        Err(e) => {
            ctx.ui.warn(&format!(
                "could not re-resolve remaining stacks ({e}); run 'stackpack sync' to repair"
            ));
            let order: Vec<String> = lockfile.stacks.keys().cloned().collect();
            inject::inject_all(&ctx.root, stacks_dir, &order, lockfile)?;
        }
    }
    Ok(())
}
