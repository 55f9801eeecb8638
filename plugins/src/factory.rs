use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use querymix_core::config::EngineConfig;
use querymix_core::{QueryEngine, ENGINE_LOG_TARGET};

use crate::engine::QueryServiceClient;

pub fn build_engine(cfg: &EngineConfig) -> Result<Arc<QueryServiceClient>> {
    let client = QueryServiceClient::from_config(cfg)
        .with_context(|| format!("failed to build query client for {}", cfg.endpoint))?;
    tracing::debug!(
        target: ENGINE_LOG_TARGET,
        endpoint = %cfg.endpoint,
        timeout_ms = cfg.timeout_ms,
        custom_ca = cfg.ca_cert_path.is_some(),
        "query client built"
    );
    Ok(Arc::new(client))
}

/// Build the engine and block until it answers a ping.
pub async fn connect(cfg: &EngineConfig) -> Result<Arc<dyn QueryEngine>> {
    let client = build_engine(cfg)?;
    client
        .wait_until_ready(Duration::from_millis(cfg.ready_timeout_ms))
        .await?;
    Ok(client)
}
