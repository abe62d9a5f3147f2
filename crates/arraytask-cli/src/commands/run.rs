//! `arraytask run` command.

use anyhow::{Context, Result};
use arraytask_core::{TaskId, exit_code, prepare};
use clap::Args;
use serde_json::json;
use tracing::{info, warn};

use super::host_env;
use crate::opts::{LaunchOpts, resolve_config};
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task id to run (default: read from the configured task id variable)
    #[arg(long, allow_hyphen_values = true)]
    pub task_id: Option<String>,

    /// Print the worker command without running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Returns the exit code the launcher should terminate with.
pub fn cmd_run(opts: &LaunchOpts, args: &RunArgs) -> Result<i32> {
    let (config, _) = resolve_config(opts)?;

    let task = match &args.task_id {
        Some(raw) => raw.parse::<TaskId>()?,
        None => TaskId::from_env(&config.task_id_var, host_env)?,
    };
    let (unit, invocation) =
        prepare(&config, task).with_context(|| format!("derive work unit for task {task}"))?;
    info!(task = %unit.task, idx = unit.idx, outfile = %unit.outfile, "mapped task");

    if args.dry_run {
        let mut warnings = Vec::new();
        if let Err(err) = config.env.check(host_env) {
            warnings.push(err.to_string());
        }
        let data = if opts.json_output() {
            json!({
                "unit": unit,
                "invocation": invocation,
                "workdir": config.workdir,
            })
        } else {
            json!(invocation.display())
        };
        print_success(opts, data, warnings)?;
        return Ok(0);
    }

    config.env.check(host_env)?;
    let status = invocation
        .run(&config.env, config.workdir.as_deref(), host_env)
        .context("run worker")?;
    let code = exit_code(status);
    if code == 0 {
        info!(outfile = %unit.outfile, "worker finished");
    } else {
        warn!(code, "worker exited with failure");
    }
    Ok(code)
}
