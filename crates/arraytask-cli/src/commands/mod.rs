//! CLI command handlers.

pub mod config;
pub mod plan;
pub mod run;

use std::env::VarError;

/// Process environment lookup used for task ids, required variables and `PATH`.
///
/// A value that is set but not UTF-8 is returned lossily so it still counts
/// as present and fails task id parsing instead of reading as unset.
pub fn host_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => Some(raw.to_string_lossy().into_owned()),
    }
}
