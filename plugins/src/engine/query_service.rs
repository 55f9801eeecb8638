use std::time::{Duration, Instant};

use async_trait::async_trait;
use querymix_core::config::EngineConfig;
use querymix_core::engine::{NamedParams, VecCursor};
use querymix_core::{
    ExecutionError, QueryEngine, QueryErrorDesc, RowCursor, StructuredQueryError,
    ENGINE_LOG_TARGET,
};
use serde::Deserialize;
use serde_json::Value;

use super::http_error::QueryHttpError;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    errors: Vec<QueryErrorDesc>,
    #[serde(default)]
    status: Option<String>,
}

impl QueryResponse {
    fn succeeded(&self) -> bool {
        matches!(self.status.as_deref(), None | Some("success") | Some("completed"))
    }
}

/// Client for the query service's HTTP/JSON endpoint (`POST /query/service`).
///
/// Safe to share between workers; `reqwest::Client` pools connections
/// internally.
#[derive(Clone)]
pub struct QueryServiceClient {
    http: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
    url_query: String,
    url_ping: String,
}

impl QueryServiceClient {
    pub fn new(
        endpoint: &str,
        username: Option<String>,
        password: Option<String>,
        timeout_ms: u64,
        ca_pem: Option<&[u8]>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_millis(timeout_ms));
        if let Some(pem) = ca_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }
        let http = builder.build()?;

        let normalized = endpoint.trim_end_matches('/');
        Ok(Self {
            http,
            username,
            password,
            url_query: format!("{}/query/service", normalized),
            url_ping: format!("{}/admin/ping", normalized),
        })
    }

    pub fn from_config(cfg: &EngineConfig) -> anyhow::Result<Self> {
        let ca_pem = match cfg.ca_cert_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Some(
                std::fs::read(path)
                    .map_err(|e| anyhow::anyhow!("failed to read CA certificate {path}: {e}"))?,
            ),
            _ => None,
        };
        Self::new(
            &cfg.endpoint,
            cfg.username.clone(),
            cfg.password.clone(),
            cfg.timeout_ms,
            ca_pem.as_deref(),
        )
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.username.as_deref() {
            Some(user) if !user.trim().is_empty() => {
                req.basic_auth(user, self.password.as_deref())
            }
            _ => req,
        }
    }

    /// Poll the ping endpoint until it answers or `timeout` elapses.
    pub async fn wait_until_ready(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.ping().await {
                Ok(()) => return Ok(()),
                Err(e) if Instant::now() >= deadline => {
                    return Err(e.context(format!(
                        "query service not ready after {}ms",
                        timeout.as_millis()
                    )));
                }
                Err(e) => {
                    tracing::debug!(
                        target: ENGINE_LOG_TARGET,
                        error = %e,
                        "query service not ready yet"
                    );
                    tokio::time::sleep(READY_POLL_INTERVAL.min(timeout)).await;
                }
            }
        }
    }

    fn request_body(statement: &str, params: &NamedParams, context_id: &str) -> Value {
        let mut body = serde_json::Map::with_capacity(params.len() + 2);
        body.insert("statement".into(), Value::String(statement.to_string()));
        body.insert("client_context_id".into(), Value::String(context_id.to_string()));
        for (name, value) in params {
            body.insert(format!("${}", name.trim_start_matches('$')), value.clone());
        }
        Value::Object(body)
    }

    fn structured(
        &self,
        statement: &str,
        context_id: String,
        http_status: u16,
        errors: Vec<QueryErrorDesc>,
    ) -> ExecutionError {
        ExecutionError::Structured(StructuredQueryError {
            statement: statement.to_string(),
            client_context_id: Some(context_id),
            errors,
            endpoint: Some(self.url_query.clone()),
            http_status: Some(http_status),
        })
    }
}

#[async_trait]
impl QueryEngine for QueryServiceClient {
    fn name(&self) -> &str {
        "query-service"
    }

    async fn execute(
        &self,
        statement: &str,
        params: &NamedParams,
    ) -> Result<Box<dyn RowCursor>, ExecutionError> {
        let context_id = uuid::Uuid::new_v4().to_string();
        let url = &self.url_query;
        let started = Instant::now();
        tracing::debug!(
            target: ENGINE_LOG_TARGET,
            stage = "query.in",
            url = %url,
            client_context_id = %context_id,
            params = params.len()
        );

        let req = self
            .http
            .post(url)
            .json(&Self::request_body(statement, params, &context_id));
        let resp = self.auth(req).send().await.map_err(|err| {
            let err = QueryHttpError::transport(err, url);
            tracing::debug!(target: ENGINE_LOG_TARGET, stage = "query.err", error = %err);
            ExecutionError::Plain(err.to_string())
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| ExecutionError::Plain(QueryHttpError::transport(err, url).to_string()))?;

        let parsed = match serde_json::from_str::<QueryResponse>(&body) {
            Ok(parsed) => parsed,
            Err(err) if status.is_success() => {
                let err = QueryHttpError::decode(status.as_u16(), url, err, &body);
                return Err(ExecutionError::Plain(err.to_string()));
            }
            Err(_) => {
                let err = QueryHttpError::status(status.as_u16(), url, &body);
                return Err(ExecutionError::Plain(err.to_string()));
            }
        };

        tracing::debug!(
            target: ENGINE_LOG_TARGET,
            stage = "query.out",
            client_context_id = %context_id,
            http_status = status.as_u16(),
            status = parsed.status.as_deref().unwrap_or(""),
            results = parsed.results.len(),
            errors = parsed.errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );

        let clean = parsed.errors.is_empty() && parsed.succeeded() && status.is_success();
        if clean {
            return Ok(Box::new(VecCursor::new(parsed.results)));
        }

        let err = self.structured(statement, context_id, status.as_u16(), parsed.errors);
        if parsed.results.is_empty() {
            Err(err)
        } else {
            Ok(Box::new(VecCursor::with_trailing_error(parsed.results, err)))
        }
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let url = &self.url_ping;
        let resp = self
            .auth(self.http.get(url))
            .send()
            .await
            .map_err(|err| QueryHttpError::transport(err, url))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(QueryHttpError::status(status.as_u16(), url, &body).into())
    }
}
