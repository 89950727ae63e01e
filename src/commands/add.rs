//! `stackpack add` - add explicit stacks to the project.

use crate::commands::{materialize, Context};
use crate::error::{StackpackError, StackpackResult};
use crate::lockfile::{LockGuard, Lockfile};
use crate::resolver::resolve;

pub fn run(ctx: &Context, stacks: Vec<String>) -> StackpackResult<()> {
    let mut config = ctx.load_config()?;
    let mut client = ctx.client(&config);
    let index = client.fetch_index()?;

    let unknown: Vec<&str> = stacks
        .iter()
        .filter(|id| !index.contains(id))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(StackpackError::Usage(format!(
            "unknown stack(s): {}",
            unknown.join(", ")
        )));
    }

    let mut added = Vec::new();
    for id in stacks {
        if config.stacks.contains(&id) {
            ctx.ui.warn(&format!("{id} is already installed, skipping"));
        } else {
            config.stacks.push(id.clone());
            added.push(id);
        }
    }
    if added.is_empty() {
        ctx.ui.info("nothing to add");
        return Ok(());
    }

    let resolution = resolve(&index.catalog(), &config.stacks)?;

    let _guard = LockGuard::acquire(&ctx.root)?;
    let mut lockfile = Lockfile::load(&ctx.root)?;
    let outcome = materialize(ctx, &config, &mut client, &index, &resolution, &mut lockfile)?;

    config.save(&ctx.root)?;
    lockfile.save(&ctx.root)?;

    for id in &outcome.installed {
        if added.contains(id) {
            ctx.ui.info(&format!("{id}: installed"));
        } else {
            ctx.ui.info(&format!("{id}: installed (dependency)"));
        }
    }
    ctx.ui
        .success(&format!("added {} stack(s)", added.len()));
    Ok(())
}
