use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine setup failed: {0}")]
    Engine(String),
    #[error("run failed: {0}")]
    Run(#[from] RunError),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that end a run after the pipeline has started.
///
/// Query failures never show up here; they are classified and counted. A
/// panicked worker does not end the run either; it is reported as a lost
/// worker.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("dispatcher task failed: {0}")]
    Dispatcher(String),
    #[error("aggregator task failed: {0}")]
    Aggregator(String),
}
