use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "querymix.toml";

/// Load the run configuration.
///
/// Priority: explicit `--config` path, then `./querymix.toml`, then built-in
/// defaults. `QUERYMIX_*` environment variables are applied last.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let local_config = Path::new(DEFAULT_CONFIG_FILE);

    let mut cfg = match explicit {
        Some(path) => read_file(path)?,
        None if local_config.exists() => read_file(local_config)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    validate(&cfg)?;
    Ok(cfg)
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })
}

/// Apply environment overrides through `lookup` so tests need not touch the
/// process environment. Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("QUERYMIX_ENDPOINT") {
        cfg.engine.endpoint = v;
    }
    if let Some(v) = get("QUERYMIX_USERNAME") {
        cfg.engine.username = Some(v);
    }
    if let Some(v) = get("QUERYMIX_PASSWORD") {
        cfg.engine.password = Some(v);
    }
    if let Some(v) = get("QUERYMIX_CA_CERT") {
        cfg.engine.ca_cert_path = Some(v);
    }
}

pub fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    let w = &cfg.workload;

    if w.workers == 0 {
        return Err(ConfigError::Invalid("workload.workers must be at least 1".into()));
    }
    if cfg.engine.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("engine.endpoint must not be empty".into()));
    }

    let mut names = HashSet::new();
    let reads = w
        .read_queries
        .iter()
        .map(|q| (q.name.as_str(), q.statement.as_str()));
    let writes = [&w.update_record, &w.update_by_predicate]
        .into_iter()
        .map(|q| (q.name.as_str(), q.statement.as_str()));

    for (name, statement) in reads.chain(writes) {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("query name must not be empty".into()));
        }
        if statement.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "query '{name}' has an empty statement"
            )));
        }
        if !names.insert(name) {
            return Err(ConfigError::Invalid(format!("duplicate query name '{name}'")));
        }
    }

    for q in [&w.update_record, &w.update_by_predicate] {
        if q.targets.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "query '{}' needs at least one target",
                q.name
            )));
        }
        if q.param.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "query '{}' needs a parameter name",
                q.name
            )));
        }
    }

    Ok(())
}
