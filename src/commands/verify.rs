//! `stackpack verify` - check installed content and marker blocks.

use crate::commands::Context;
use crate::error::{StackpackError, StackpackResult};
use crate::inject;
use crate::integrity::verify_stack;
use crate::lockfile::Lockfile;
use crate::store::StackStore;

pub fn run(ctx: &Context, strict: bool) -> StackpackResult<()> {
    let config = ctx.load_config()?;
    let lockfile = Lockfile::load(&ctx.root)?;
    if lockfile.stacks.is_empty() {
        return Err(StackpackError::Usage(
            "nothing is installed - run 'stackpack sync' first".to_string(),
        ));
    }

    let store = StackStore::new(&ctx.root, &config);
    let mut findings = 0usize;

    for (id, state) in &lockfile.stacks {
        let result = verify_stack(
            &store.stack_dir(id),
            id,
            &state.files,
            &state.hash,
            &state.file_hashes,
        );
        if result.ok {
            ctx.ui.success(&format!("{id}: ok"));
            continue;
        }
        findings += 1;
        for file in &result.missing {
            ctx.ui.error(&format!("{id}: missing {file}"));
        }
        for file in &result.tampered {
            ctx.ui.error(&format!("{id}: tampered {file}"));
        }
    }

    // Marker blocks: every entry point some installed stack opts into.
    let mut expected_entries: Vec<&str> = Vec::new();
    for state in lockfile.stacks.values() {
        for entry in inject::entry_points(&state.tools) {
            if !expected_entries.contains(&entry) {
                expected_entries.push(entry);
            }
        }
    }
    for entry in expected_entries {
        if inject::has_block(&ctx.root.join(entry)) {
            ctx.ui.success(&format!("{entry}: managed block present"));
        } else {
            findings += 1;
            ctx.ui.error(&format!("{entry}: managed block missing"));
        }
    }

    if strict {
        match ctx.client(&config).fetch_index() {
            Ok(index) => {
                for (id, state) in &lockfile.stacks {
                    match index.stacks.get(id) {
                        Some(meta) if meta.version != state.version => {
                            findings += 1;
                            ctx.ui.error(&format!(
                                "{id}: outdated ({} locked, {} in registry)",
                                state.version, meta.version
                            ));
                        }
                        Some(_) => {}
                        None => {
                            findings += 1;
                            ctx.ui.error(&format!("{id}: removed from registry"));
                        }
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    if findings > 0 {
        ctx.ui.detail("run 'stackpack sync' to repair");
        return Err(StackpackError::VerificationFailed { count: findings });
    }
    ctx.ui.success("all stacks verified");
    Ok(())
}
