use crate::config::ClassifierConfig;
use crate::engine::{ExecutionError, StructuredQueryError};

use super::task::Outcome;

/// Sorts execution errors into success, benign contention, and failure.
///
/// A structured error is a conflict only when it carries at least one
/// sub-error and every code is benign. An empty list is a failure.
#[derive(Debug, Clone)]
pub struct Classifier {
    benign_codes: Vec<u32>,
}

impl Classifier {
    pub fn new(benign_codes: impl IntoIterator<Item = u32>) -> Self {
        let mut benign_codes: Vec<u32> = benign_codes.into_iter().collect();
        benign_codes.sort_unstable();
        benign_codes.dedup();
        Self { benign_codes }
    }

    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        Self::new([cfg.conflict_code, cfg.aborted_code])
    }

    pub fn classify(&self, err: Option<&ExecutionError>) -> Outcome {
        match err {
            None => Outcome::Success,
            Some(ExecutionError::Structured(q)) if self.is_benign(q) => Outcome::Conflict,
            Some(ExecutionError::Structured(q)) => Outcome::Failure(structured_detail(q)),
            Some(ExecutionError::Plain(message)) => Outcome::Failure(message.clone()),
        }
    }

    fn is_benign(&self, err: &StructuredQueryError) -> bool {
        !err.errors.is_empty()
            && err
                .codes()
                .all(|code| self.benign_codes.binary_search(&code).is_ok())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

fn structured_detail(err: &StructuredQueryError) -> String {
    serde_json::to_string(err).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "query error json encoding failed");
        err.to_string()
    })
}
