mod load;
mod types;

pub use load::{apply_env_overrides, load_config, validate, DEFAULT_CONFIG_FILE};
pub use types::{
    AppConfig, ClassifierConfig, EngineConfig, KeyspaceConfig, LoggingConfig, QueryDescriptor,
    RotatingQueryConfig, WorkloadConfig,
};
