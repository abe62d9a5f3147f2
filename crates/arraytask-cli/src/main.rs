mod commands;
mod opts;
mod output;

use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::plan::PlanArgs;
use commands::run::RunArgs;
use opts::LaunchOpts;

#[derive(Parser, Debug)]
#[command(
    name = "arraytask",
    version,
    about = "Launch one scheduler array task against an external worker"
)]
struct Cli {
    #[command(flatten)]
    opts: LaunchOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Map this task's id to its work offset and run the worker
    Run(RunArgs),

    /// List the work units for an array range
    Plan(PlanArgs),

    /// Show the resolved launcher config
    Config,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.opts.quiet);

    match dispatch(&cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

fn dispatch(cli: &Cli) -> Result<i32> {
    let opts = &cli.opts;
    match &cli.command {
        Command::Run(args) => commands::run::cmd_run(opts, args),
        Command::Plan(args) => commands::plan::cmd_plan(opts, args).map(|_| 0),
        Command::Config => commands::config::cmd_config(opts).map(|_| 0),
    }
}

/// Logs go to stderr so stdout stays clean for `plan`, `config` and dry runs.
fn setup_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}
