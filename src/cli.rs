use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// stackpack - dependency-resolving installer for AI instruction stacks
#[derive(Parser, Debug)]
#[command(name = "stackpack")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Run 'stackpack init' in a project to get started.")]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Registry host or base URL (overrides stackpack.toml)
    #[arg(long, global = true)]
    pub registry: Option<String>,

    /// GitLab project path, e.g. group/ai-stacks (overrides stackpack.toml)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Registry branch (overrides stackpack.toml)
    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Registry access token (or STACKPACK_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Enable debug output on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create stackpack.toml and install an initial set of stacks
    Init {
        /// Stacks to install non-interactively (comma-separated)
        #[arg(long, value_delimiter = ',')]
        stacks: Option<Vec<String>>,

        /// Skip confirmation prompts
        #[arg(short, long)]
        yes: bool,
    },

    /// Bring installed stacks in line with the registry
    Sync,

    /// Add stacks to the project
    Add {
        /// Stack ids to add
        #[arg(required = true)]
        stacks: Vec<String>,
    },

    /// Remove stacks from the project
    Remove {
        /// Stack ids to remove
        #[arg(required = true)]
        stacks: Vec<String>,

        /// Remove orphaned dependencies without prompting
        #[arg(long)]
        auto_orphans: bool,
    },

    /// List all stacks in the registry
    List,

    /// Search stacks by name, description, or category
    Search {
        /// Search term (case-insensitive substring)
        query: String,
    },

    /// Show installed stacks with newer registry versions
    Outdated,

    /// Verify installed stack content and marker blocks
    Verify {
        /// Also check the registry for version drift
        #[arg(long)]
        strict: bool,
    },

    /// Diagnose the project setup
    Doctor,

    /// Print the stackpack version
    Version,
}
