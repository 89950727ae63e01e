//! `stackpack outdated` - report version drift between lockfile and registry.

use crate::commands::Context;
use crate::error::StackpackResult;
use crate::lockfile::Lockfile;

pub fn run(ctx: &Context) -> StackpackResult<()> {
    let config = ctx.load_config()?;
    let index = ctx.client(&config).fetch_index()?;
    let lockfile = Lockfile::load(&ctx.root)?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (id, state) in &lockfile.stacks {
        match index.stacks.get(id) {
            Some(meta) if meta.version != state.version => rows.push(vec![
                id.clone(),
                state.version.clone(),
                meta.version.clone(),
                "update available".to_string(),
            ]),
            Some(_) => {}
            None => rows.push(vec![
                id.clone(),
                state.version.clone(),
                "-".to_string(),
                "removed from registry".to_string(),
            ]),
        }
    }

    if rows.is_empty() {
        ctx.ui.success("all stacks up to date");
    } else {
        ctx.ui.table(&["STACK", "LOCKED", "LATEST", "STATUS"], &rows);
        ctx.ui.detail("run 'stackpack sync' to update");
    }
    Ok(())
}
