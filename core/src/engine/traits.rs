use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::Value;

use super::error::ExecutionError;

/// Named query parameters, keyed without the `$` prefix.
pub type NamedParams = serde_json::Map<String, Value>;

/// A query engine that many workers may call at once.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(
        &self,
        statement: &str,
        params: &NamedParams,
    ) -> Result<Box<dyn RowCursor>, ExecutionError>;

    /// Succeeds once the engine accepts queries.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Forward-only row iteration.
///
/// `Ok(None)` ends iteration cleanly. An `Err` is terminal and may arrive
/// after some rows were already yielded.
#[async_trait]
pub trait RowCursor: Send {
    async fn next_row(&mut self) -> Result<Option<Value>, ExecutionError>;
}

/// Cursor over rows that are already in memory, with an optional error
/// reported once the rows run out.
#[derive(Debug, Default)]
pub struct VecCursor {
    rows: VecDeque<Value>,
    trailing: Option<ExecutionError>,
}

impl VecCursor {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows: rows.into(),
            trailing: None,
        }
    }

    pub fn with_trailing_error(rows: Vec<Value>, err: ExecutionError) -> Self {
        Self {
            rows: rows.into(),
            trailing: Some(err),
        }
    }
}

#[async_trait]
impl RowCursor for VecCursor {
    async fn next_row(&mut self) -> Result<Option<Value>, ExecutionError> {
        if let Some(row) = self.rows.pop_front() {
            return Ok(Some(row));
        }
        match self.trailing.take() {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}
