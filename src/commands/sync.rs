//! `stackpack sync` - bring installed stacks in line with the registry.

use crate::commands::{materialize, Context};
use crate::error::{StackpackError, StackpackResult};
use crate::lockfile::{LockGuard, Lockfile};
use crate::resolver::resolve;

pub fn run(ctx: &Context) -> StackpackResult<()> {
    let config = ctx.load_config()?;
    if config.stacks.is_empty() {
        return Err(StackpackError::Usage(
            "no stacks configured - run 'stackpack add <stack>' first".to_string(),
        ));
    }

    let mut client = ctx.client(&config);
    let index = client.fetch_index()?;
    let resolution = resolve(&index.catalog(), &config.stacks)?;

    let _guard = LockGuard::acquire(&ctx.root)?;
    let mut lockfile = Lockfile::load(&ctx.root)?;
    let outcome = materialize(ctx, &config, &mut client, &index, &resolution, &mut lockfile)?;
    lockfile.save(&ctx.root)?;

    for (id, old, new) in &outcome.updated {
        if old == new {
            ctx.ui.info(&format!("{id}: re-downloaded {new}"));
        } else {
            ctx.ui.info(&format!("{id}: {old} -> {new}"));
        }
    }
    for id in &outcome.installed {
        ctx.ui.info(&format!("{id}: installed"));
    }
    for id in &outcome.cleaned {
        ctx.ui.info(&format!("{id}: removed (no longer needed)"));
    }

    ctx.ui.success(&format!(
        "{} updated, {} installed, {} unchanged, {} cleaned up",
        outcome.updated.len(),
        outcome.installed.len(),
        outcome.unchanged.len(),
        outcome.cleaned.len()
    ));
    Ok(())
}
