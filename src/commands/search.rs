//! `stackpack search` - substring search over the registry catalog.

use crate::commands::Context;
use crate::error::StackpackResult;

pub fn run(ctx: &Context, query: &str) -> StackpackResult<()> {
    let config = ctx.load_config()?;
    let index = ctx.client(&config).fetch_index()?;

    let needle = query.to_lowercase();
    let mut hits = 0usize;
    // BTreeMap iteration keeps results sorted by id.
    for (id, meta) in &index.stacks {
        let haystacks = [id, &meta.name, &meta.description, &meta.category];
        if haystacks
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        {
            hits += 1;
            if meta.description.is_empty() {
                ctx.ui.plain(&format!("{id} ({})", meta.version));
            } else {
                ctx.ui
                    .plain(&format!("{id} ({}) - {}", meta.version, meta.description));
            }
        }
    }

    if hits == 0 {
        ctx.ui.plain(&format!("no stacks found for '{query}'"));
    }
    Ok(())
}
