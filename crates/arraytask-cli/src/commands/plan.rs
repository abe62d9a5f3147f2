//! `arraytask plan` command.

use anyhow::{Context, Result};
use arraytask_core::{ArraySpec, plan};
use clap::Args;
use serde_json::json;

use crate::opts::{LaunchOpts, resolve_config};
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Array range expression, e.g. `0-99`, `1,3,5-7`, `0-99:10%4`
    #[arg(long)]
    pub array: ArraySpec,
}

pub fn cmd_plan(opts: &LaunchOpts, args: &PlanArgs) -> Result<()> {
    let (config, _) = resolve_config(opts)?;
    let units = plan(&config.mapper(), &args.array)
        .with_context(|| format!("plan array {}", args.array))?;

    let data = if opts.json_output() {
        json!({
            "array": args.array.to_string(),
            "limit": args.array.limit(),
            "count": args.array.task_count(),
            "units": units,
        })
    } else {
        let mut table = format!("{:>8} {:>12}  {}", "TASK", "IDX", "OUTFILE");
        for unit in &units {
            table.push_str(&format!(
                "\n{:>8} {:>12}  {}",
                unit.task, unit.idx, unit.outfile
            ));
        }
        json!(table)
    };
    print_success(opts, data, Vec::new())
}
