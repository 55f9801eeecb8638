pub mod config;
pub mod engine;
pub mod error;
pub mod workload;

pub use config::{load_config, AppConfig};
pub use engine::{ExecutionError, QueryEngine, QueryErrorDesc, RowCursor, StructuredQueryError};
pub use error::{CliError, ConfigError, RunError};

/// Tracing target for worker lifecycle and outcome lines (the app log sink).
pub const APP_LOG_TARGET: &str = "querymix::app";

/// Tracing target for query-engine diagnostics (the engine log sink).
pub const ENGINE_LOG_TARGET: &str = "querymix::engine";
