//! stackpack CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use stackpack::cli::{Cli, Commands};
use stackpack::commands::{self, Context};
use stackpack::ui::Ui;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let ui = Ui::detect(cli.no_color, cli.debug);
    let root = cli
        .dir
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let ctx = Context {
        root,
        ui,
        registry: cli.registry,
        project: cli.project,
        branch: cli.branch,
        token: cli.token,
    };

    let result = match cli.command {
        Commands::Init { stacks, yes } => commands::init::run(&ctx, stacks, yes),
        Commands::Sync => commands::sync::run(&ctx),
        Commands::Add { stacks } => commands::add::run(&ctx, stacks),
        Commands::Remove {
            stacks,
            auto_orphans,
        } => commands::remove::run(&ctx, stacks, auto_orphans),
        Commands::List => commands::list::run(&ctx),
        Commands::Search { query } => commands::search::run(&ctx, &query),
        Commands::Outdated => commands::outdated::run(&ctx),
        Commands::Verify { strict } => commands::verify::run(&ctx, strict),
        Commands::Doctor => commands::doctor::run(&ctx),
        Commands::Version => {
            ctx.ui
                .plain(&format!("stackpack {}", env!("CARGO_PKG_VERSION")));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ctx.ui.error(&e.to_string());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
