//! Per-task launcher core for scheduler array jobs.
//!
//! A task id `T` maps to the work offset `idx = T * stride` and an output
//! filename; the worker is then invoked with those values as arguments.

pub mod array;
pub mod config;
pub mod env;
pub mod error;
pub mod invocation;
pub mod task;

pub use array::{ArraySpec, MAX_ARRAY_TASKS, plan};
pub use config::{ConfigSource, LauncherConfig};
pub use env::RuntimeEnv;
pub use error::{Error, Result};
pub use invocation::{Invocation, WorkerSpec, exit_code};
pub use task::{OutfileTemplate, TaskId, TaskMapper, WorkUnit};

/// Derive the work unit for `task` and the worker call that processes it.
pub fn prepare(config: &LauncherConfig, task: TaskId) -> Result<(WorkUnit, Invocation)> {
    let unit = config.mapper().map(task)?;
    let invocation = Invocation::new(&config.worker, &unit);
    Ok((unit, invocation))
}
