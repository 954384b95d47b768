//! scs — keep a local mirror of a place's scripts in sync with the remote.
//!
//! # Usage
//!
//! ```text
//! scs init --universe <id> --place <id> [--force]
//! scs pull [--json]
//! scs push [--json]
//! scs monitor [--once] [--interval <secs>]
//!
//! global: --config <path>  --mirror <dir>
//! ```

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use commands::{
    init::InitArgs, monitor::MonitorArgs, pull::PullArgs, push::PushArgs, GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "scs",
    version,
    about = "Mirror a place's scripts to local files and push edits back",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter scs.yaml and create the mirror directory.
    Init(InitArgs),

    /// Download every script into the mirror directory.
    Pull(PullArgs),

    /// Upload every mirrored script to the instance it is bound to.
    Push(PushArgs),

    /// Watch the mirror and push files as they change.
    Monitor(MonitorArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    init_tracing();
    match command {
        Commands::Init(args) => args.run(&cli.global),
        Commands::Pull(args) => args.run(&cli.global),
        Commands::Push(args) => args.run(&cli.global),
        Commands::Monitor(args) => args.run(&cli.global),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
