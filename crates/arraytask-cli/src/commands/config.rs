//! `arraytask config` command.

use anyhow::Result;
use arraytask_core::ConfigSource;
use serde_json::json;

use crate::opts::{LaunchOpts, resolve_config};
use crate::output::print_success;

pub fn cmd_config(opts: &LaunchOpts) -> Result<()> {
    let (config, source) = resolve_config(opts)?;
    let source = match source {
        ConfigSource::File(path) => json!(path),
        ConfigSource::Defaults => json!("defaults"),
    };
    if opts.json_output() {
        print_success(opts, json!({ "source": source, "config": config }), Vec::new())
    } else {
        print_success(opts, serde_json::to_value(&config)?, Vec::new())
    }
}
