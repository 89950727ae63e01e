//! `stackpack init` - create the project config and install initial stacks.

use crate::commands::{materialize, Context};
use crate::config::{self, Config};
use crate::error::{StackpackError, StackpackResult};
use crate::lockfile::{LockGuard, Lockfile};
use crate::resolver::{resolve, Resolution};

pub fn run(ctx: &Context, stacks: Option<Vec<String>>, yes: bool) -> StackpackResult<()> {
    if Config::exists(&ctx.root) {
        return Err(StackpackError::Usage(format!(
            "{} already exists - use 'stackpack add' or 'stackpack sync'",
            config::CONFIG_NAME
        )));
    }

    let registry = ctx
        .registry
        .clone()
        .or_else(|| std::env::var("STACKPACK_REGISTRY").ok().filter(|r| !r.is_empty()))
        .ok_or_else(|| {
            StackpackError::Config(
                "no registry configured - pass --registry or set STACKPACK_REGISTRY".to_string(),
            )
        })?;
    let project = ctx
        .project
        .clone()
        .or_else(|| std::env::var("STACKPACK_PROJECT").ok().filter(|p| !p.is_empty()));
    let branch = ctx
        .branch
        .clone()
        .unwrap_or_else(|| config::DEFAULT_BRANCH.to_string());

    let mut config = Config::new(registry, project, branch);
    let mut client = ctx.client(&config);
    let index = client.fetch_index()?;
    if index.stacks.is_empty() {
        return Err(StackpackError::Usage("the registry has no stacks".to_string()));
    }

    let chosen = match stacks {
        Some(ids) => {
            let unknown: Vec<&str> = ids
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
            ids
        }
        None => select_interactively(ctx, &index)?,
    };
    if chosen.is_empty() {
        return Err(StackpackError::Usage("no stacks selected".to_string()));
    }

    let resolution = resolve(&index.catalog(), &chosen)?;
    print_plan(ctx, &resolution);

    if !yes && !ctx.ui.confirm("Install these stacks?", true)? {
        return Err(StackpackError::Aborted);
    }

    let _guard = LockGuard::acquire(&ctx.root)?;
    let mut lockfile = Lockfile::default();
    let outcome = materialize(ctx, &config, &mut client, &index, &resolution, &mut lockfile)?;

    config.stacks = chosen;
    config.save(&ctx.root)?;
    lockfile.save(&ctx.root)?;

    ctx.ui.success(&format!(
        "installed {} stack(s) into {}/{}",
        outcome.installed.len(),
        config.stacks_dir,
        config::MANAGED_DIR
    ));
    ctx.ui.detail(&format!(
        "commit {}, {} and the {} directory",
        config::CONFIG_NAME,
        crate::lockfile::LOCKFILE_NAME,
        config.stacks_dir
    ));
    Ok(())
}

fn select_interactively(
    ctx: &Context,
    index: &crate::registry::RegistryIndex,
) -> StackpackResult<Vec<String>> {
    if !ctx.ui.is_interactive() {
        return Err(StackpackError::Usage(
            "not a terminal - pass --stacks to choose stacks non-interactively".to_string(),
        ));
    }

    let ids: Vec<&String> = index.stacks.keys().collect();
    let items: Vec<String> = ids
        .iter()
        .map(|id| {
            let meta = &index.stacks[id.as_str()];
            if meta.description.is_empty() {
                format!("{id} ({})", meta.version)
            } else {
                format!("{id} ({}) - {}", meta.version, meta.description)
            }
        })
        .collect();

    let selected = ctx.ui.multi_select("Select stacks to install", &items)?;
    Ok(selected.into_iter().map(|i| ids[i].clone()).collect())
}

fn print_plan(ctx: &Context, resolution: &Resolution) {
    ctx.ui.plain("");
    for id in &resolution.order {
        if resolution.is_explicit(id) {
            ctx.ui.plain(&format!("  {id}"));
        } else {
            let requester = resolution
                .dependency_of
                .get(id)
                .map(String::as_str)
                .unwrap_or("?");
            ctx.ui.plain(&format!("  {id} (required by {requester})"));
        }
    }
    ctx.ui
        .plain(&format!("\n{} stack(s) total", resolution.order.len()));
}
