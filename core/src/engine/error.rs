use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a query service `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryErrorDesc {
    pub code: u32,
    #[serde(rename = "msg", default)]
    pub message: String,
}

impl QueryErrorDesc {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A query error that carries an ordered list of coded sub-errors.
///
/// Its JSON form is what ends up in failure breakdowns, so field order and
/// naming are part of the report format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQueryError {
    pub statement: String,
    /// Per-request id. Not serialized, so equal errors produce equal details.
    #[serde(default, skip_serializing)]
    pub client_context_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<QueryErrorDesc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl StructuredQueryError {
    pub fn new(statement: impl Into<String>, errors: Vec<QueryErrorDesc>) -> Self {
        Self {
            statement: statement.into(),
            errors,
            ..Self::default()
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.errors.iter().map(|e| e.code)
    }
}

impl fmt::Display for StructuredQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query error")?;
        if let Some(status) = self.http_status {
            write!(f, " status={}", status)?;
        }
        if self.errors.is_empty() {
            return write!(f, ": <no error details>");
        }
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}[{}] {}", sep, e.code, e.message)?;
        }
        Ok(())
    }
}

/// Everything a query invocation or row iteration can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Transport, status, or decode problems; only a message survives.
    #[error("{0}")]
    Plain(String),
    #[error("{0}")]
    Structured(StructuredQueryError),
}

impl ExecutionError {
    pub fn plain(message: impl Into<String>) -> Self {
        Self::Plain(message.into())
    }
}

impl From<StructuredQueryError> for ExecutionError {
    fn from(err: StructuredQueryError) -> Self {
        Self::Structured(err)
    }
}
