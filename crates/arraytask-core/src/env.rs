//! Explicit runtime environment for the worker process.
//!
//! Replaces ambient shell setup (module loads, environment activation) with
//! a value that is checked and applied to the worker's `Command`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeEnv {
    /// Variables that must be present before the worker starts.
    pub require: Vec<String>,
    /// Variables set (or overridden) for the worker.
    pub set: BTreeMap<String, String>,
    /// Directories placed ahead of the inherited `PATH`.
    pub path_prepend: Vec<PathBuf>,
    /// Start the worker from an empty environment instead of inheriting.
    pub clear: bool,
}

impl RuntimeEnv {
    /// Every name in `require` must be provided by `set` or by `lookup`.
    /// All missing names are reported together.
    pub fn check<F>(&self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = self
            .require
            .iter()
            .filter(|name| {
                !self.set.contains_key(*name) && (self.clear || lookup(name.as_str()).is_none())
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingEnv { names: missing })
        }
    }

    pub fn apply<F>(&self, command: &mut Command, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.clear {
            command.env_clear();
        }
        for (key, value) in &self.set {
            command.env(key, value);
        }
        if !self.path_prepend.is_empty() {
            command.env("PATH", self.search_path(lookup)?);
        }
        Ok(())
    }

    /// `path_prepend` followed by the effective `PATH` (from `set`, else
    /// inherited unless `clear`).
    pub fn search_path<F>(&self, lookup: F) -> Result<OsString>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match self.set.get("PATH") {
            Some(path) => Some(path.clone()),
            None if self.clear => None,
            None => lookup("PATH"),
        };
        let mut dirs: Vec<PathBuf> = self.path_prepend.clone();
        if let Some(base) = base {
            dirs.extend(std::env::split_paths(&base));
        }
        std::env::join_paths(dirs)
            .map_err(|err| Error::Config(format!("path_prepend entry not usable in PATH: {err}")))
    }
}
