//! `stackpack list` - show the registry catalog grouped by category.

use crate::commands::{by_category, Context};
use crate::error::StackpackResult;
use crate::lockfile::Lockfile;

pub fn run(ctx: &Context) -> StackpackResult<()> {
    let config = ctx.load_config()?;
    let index = ctx.client(&config).fetch_index()?;
    let lockfile = Lockfile::load(&ctx.root)?;

    let mut installed = 0usize;
    for (category, ids) in by_category(&index) {
        ctx.ui.plain(&format!("\n{}", capitalize(&category)));
        for id in ids {
            let meta = &index.stacks[id];
            let mark = if lockfile.is_installed(id) {
                installed += 1;
                "*"
            } else {
                " "
            };

            let mut line = format!("{mark} {id} {}", meta.version);
            if let Some(state) = lockfile.stacks.get(id) {
                if state.version != meta.version {
                    line.push_str(&format!(" (local: {})", state.version));
                }
            }
            if !meta.name.is_empty() {
                line.push_str(&format!(" - {}", meta.name));
            }
            if !meta.depends.is_empty() {
                line.push_str(&format!(" (depends: {})", meta.depends.join(", ")));
            }
            ctx.ui.plain(&format!("  {line}"));
        }
    }

    ctx.ui.plain(&format!(
        "\n* = installed ({installed}/{})",
        index.stacks.len()
    ));
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
