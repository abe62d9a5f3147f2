use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("task id not set (expected integer in ${var})")]
    MissingTaskId { var: String },
    #[error("invalid task id '{value}': expected an integer")]
    InvalidTaskId { value: String },
    #[error("work offset overflows for task {task} with stride {stride}")]
    OffsetOverflow { task: i64, stride: i64 },
    #[error("invalid outfile template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("invalid array spec '{spec}': {reason}")]
    InvalidArraySpec { spec: String, reason: String },
    #[error("missing required environment variables: {}", names.join(", "))]
    MissingEnv { names: Vec<String> },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to spawn worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
