//! Global CLI options and config resolution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use arraytask_core::config::{self, ConfigSource};
use arraytask_core::LauncherConfig;
use clap::Args;

/// Global options for CLI commands.
#[derive(Args, Debug, Clone)]
pub struct LaunchOpts {
    /// Launcher config file (env: ARRAYTASK_CONFIG, default: nearest arraytask.json)
    #[arg(short = 'c', long, global = true, env = "ARRAYTASK_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON output envelope
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output (implies --json)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl LaunchOpts {
    pub fn json_output(&self) -> bool {
        self.json || self.pretty
    }
}

/// Resolve the launcher config from `--config`, `ARRAYTASK_CONFIG`, the
/// nearest `arraytask.json` above the current directory, or defaults.
pub fn resolve_config(opts: &LaunchOpts) -> Result<(LauncherConfig, ConfigSource)> {
    let cwd = std::env::current_dir().context("get current directory")?;
    let resolved = config::resolve(opts.config.as_deref(), &cwd)?;
    match &resolved.1 {
        ConfigSource::File(path) => tracing::debug!(config = %path.display(), "using config file"),
        ConfigSource::Defaults => tracing::debug!("using built-in config defaults"),
    }
    Ok(resolved)
}
