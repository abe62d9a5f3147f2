//! Worker argument vector and process execution.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::env::RuntimeEnv;
use crate::error::{Error, Result};
use crate::task::WorkUnit;

/// How to call the external worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSpec {
    pub program: String,
    /// Arguments placed before the derived ones (usually the script path).
    pub args: Vec<String>,
    pub logging_flag: String,
    pub seed_flag: String,
    pub outfile_flag: String,
}

impl Default for WorkerSpec {
    fn default() -> Self {
        Self {
            program: "python".into(),
            args: vec!["test_sample.py".into()],
            logging_flag: "--logging".into(),
            seed_flag: "--seed_index".into(),
            outfile_flag: "--outfile".into(),
        }
    }
}

impl WorkerSpec {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("worker.program", &self.program),
            ("worker.logging_flag", &self.logging_flag),
            ("worker.seed_flag", &self.seed_flag),
            ("worker.outfile_flag", &self.outfile_flag),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Fully resolved worker command line for one work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(worker: &WorkerSpec, unit: &WorkUnit) -> Self {
        let mut args = worker.args.clone();
        args.push(worker.logging_flag.clone());
        args.push(worker.seed_flag.clone());
        args.push(unit.idx.to_string());
        args.push(worker.outfile_flag.clone());
        args.push(unit.outfile.clone());
        Self {
            program: worker.program.clone(),
            args,
        }
    }

    /// Shell-style rendering for logs and dry runs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn command<F>(&self, env: &RuntimeEnv, workdir: Option<&Path>, lookup: F) -> Result<Command>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.stdin(Stdio::inherit());
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }
        env.apply(&mut command, lookup)?;
        Ok(command)
    }

    /// Spawn the worker and block until it exits.
    pub fn run<F>(&self, env: &RuntimeEnv, workdir: Option<&Path>, lookup: F) -> Result<ExitStatus>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut command = self.command(env, workdir, lookup)?;
        info!(command = %self.display(), "starting worker");
        let mut child = command.spawn().map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })?;
        debug!(pid = child.id(), "worker spawned");
        child.wait().map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Exit code the launcher should report for a finished worker.
///
/// A worker killed by a signal maps to `128 + signal` on unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
