//! Launcher configuration file (`arraytask.json`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::env::RuntimeEnv;
use crate::error::{Error, Result};
use crate::invocation::WorkerSpec;
use crate::task::{DEFAULT_STRIDE, OutfileTemplate, TaskMapper};

/// File name searched for when no config path is given.
pub const CONFIG_FILE_NAME: &str = "arraytask.json";

/// Variable the scheduler uses for the array task id.
pub const DEFAULT_TASK_ID_VAR: &str = "SLURM_ARRAY_TASK_ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherConfig {
    pub task_id_var: String,
    pub stride: i64,
    pub outfile_template: OutfileTemplate,
    /// Worker working directory; relative paths resolve against the config
    /// file's directory. `None` keeps the launcher's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    pub worker: WorkerSpec,
    pub env: RuntimeEnv,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            task_id_var: DEFAULT_TASK_ID_VAR.into(),
            stride: DEFAULT_STRIDE,
            outfile_template: OutfileTemplate::default(),
            workdir: None,
            worker: WorkerSpec::default(),
            env: RuntimeEnv::default(),
        }
    }
}

impl LauncherConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: LauncherConfig =
            serde_json::from_str(&text).map_err(|source| Error::ParseConfig {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(workdir) = config.workdir.take() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.workdir = Some(if workdir.is_relative() {
                base.join(workdir)
            } else {
                workdir
            });
        }
        config.validate()?;
        debug!(path = %path.display(), "loaded launcher config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.task_id_var.trim().is_empty() {
            return Err(Error::Config("task_id_var must not be empty".into()));
        }
        if self.stride == 0 {
            return Err(Error::Config("stride must be non-zero".into()));
        }
        self.worker.validate()
    }

    pub fn mapper(&self) -> TaskMapper {
        TaskMapper::new(self.stride, self.outfile_template.clone())
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Resolve the config.
///
/// Priority:
/// 1. `explicit` path (`--config` or `ARRAYTASK_CONFIG`)
/// 2. Walk up from `cwd` looking for `arraytask.json`
/// 3. Built-in defaults
pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<(LauncherConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let path = if path.is_relative() {
            cwd.join(path)
        } else {
            path.to_path_buf()
        };
        return Ok((LauncherConfig::load(&path)?, ConfigSource::File(path)));
    }
    if let Some(path) = find_config(cwd, None) {
        return Ok((LauncherConfig::load(&path)?, ConfigSource::File(path)));
    }
    debug!("no {CONFIG_FILE_NAME} found; using defaults");
    Ok((LauncherConfig::default(), ConfigSource::Defaults))
}

/// Nearest `arraytask.json` at or above `start`, not looking past `ceiling`.
fn find_config(start: &Path, ceiling: Option<&Path>) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if Some(dir) == ceiling {
            break;
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_worker_contract() {
        let config = LauncherConfig::default();
        config.validate().unwrap();
        assert_eq!(config.task_id_var, "SLURM_ARRAY_TASK_ID");
        assert_eq!(config.stride, 100);
        assert_eq!(config.worker.program, "python");
    }

    #[test]
    fn load_partial_file_and_resolve_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{
                "stride": 50,
                "outfile_template": "galaxy_{idx}.h5",
                "workdir": "runs",
                "worker": { "args": ["cannon/test_sample.py"] },
                "env": { "require": ["SCRATCH"] }
            }"#,
        )
        .unwrap();

        let config = LauncherConfig::load(&path).unwrap();
        assert_eq!(config.stride, 50);
        assert_eq!(config.workdir, Some(dir.path().join("runs")));
        assert_eq!(config.worker.program, "python");
        assert_eq!(config.worker.args, ["cannon/test_sample.py"]);
        assert_eq!(config.worker.seed_flag, "--seed_index");
        assert_eq!(config.task_id_var, DEFAULT_TASK_ID_VAR);
        assert_eq!(config.env.require, ["SCRATCH"]);

        let unit = config.mapper().map(crate::TaskId(2)).unwrap();
        assert_eq!(unit.outfile, "galaxy_100.h5");
    }

    #[test]
    fn load_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");

        fs::write(&path, r#"{"stride": 0}"#).unwrap();
        assert!(matches!(LauncherConfig::load(&path), Err(Error::Config(_))));

        fs::write(&path, r#"{"outfile_template": "fixed.h5"}"#).unwrap();
        assert!(matches!(
            LauncherConfig::load(&path),
            Err(Error::ParseConfig { .. })
        ));

        fs::write(&path, r#"{"partition": "gpu"}"#).unwrap();
        assert!(matches!(
            LauncherConfig::load(&path),
            Err(Error::ParseConfig { .. })
        ));

        assert!(matches!(
            LauncherConfig::load(&dir.path().join("missing.json")),
            Err(Error::ReadConfig { .. })
        ));
    }

    #[test]
    fn find_config_stops_at_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_config(&nested, Some(dir.path())), None);

        fs::write(dir.path().join("a").join(CONFIG_FILE_NAME), "{}").unwrap();
        assert_eq!(
            find_config(&nested, Some(dir.path())),
            Some(dir.path().join("a").join(CONFIG_FILE_NAME))
        );
        assert_eq!(find_config(&nested, Some(nested.as_path())), None);
    }

    #[test]
    fn resolve_walks_up_to_nearest_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"task_id_var": "PBS_ARRAYID"}"#).unwrap();
        let (config, source) = resolve(None, &nested).unwrap();
        assert_eq!(source, ConfigSource::File(path));
        assert_eq!(config.task_id_var, "PBS_ARRAYID");
    }

    #[test]
    fn explicit_relative_path_uses_cwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("custom.json"), r#"{"stride": 10}"#).unwrap();
        let (config, _) = resolve(Some(Path::new("custom.json")), dir.path()).unwrap();
        assert_eq!(config.stride, 10);
    }
}
