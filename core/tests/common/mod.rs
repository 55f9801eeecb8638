#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use querymix_core::engine::{NamedParams, VecCursor};
use querymix_core::workload::{Aggregator, Classifier, StatsTable, Task, WorkerPool};
use querymix_core::{
    ExecutionError, QueryEngine, QueryErrorDesc, RowCursor, StructuredQueryError,
};
use serde_json::json;
use tokio::sync::mpsc;

/// What the scripted engine does for a given statement.
#[derive(Debug, Clone)]
pub enum Script {
    Rows(usize),
    Fail(ExecutionError),
    RowsThenFail(usize, ExecutionError),
    Panic,
}

/// Deterministic engine keyed by statement text. Unknown statements return one row.
#[derive(Default)]
pub struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    calls: AtomicU64,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, statement: impl Into<String>, script: Script) -> Self {
        self.scripts.insert(statement.into(), script);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(
        &self,
        statement: &str,
        _params: &NamedParams,
    ) -> Result<Box<dyn RowCursor>, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let rows = |n: usize| (0..n).map(|i| json!({ "row": i })).collect::<Vec<_>>();
        match self.scripts.get(statement).cloned().unwrap_or(Script::Rows(1)) {
            Script::Rows(n) => Ok(Box::new(VecCursor::new(rows(n)))),
            Script::Fail(err) => Err(err),
            Script::RowsThenFail(n, err) => {
                Ok(Box::new(VecCursor::with_trailing_error(rows(n), err)))
            }
            Script::Panic => panic!("scripted engine panic"),
        }
    }
}

pub fn structured(statement: &str, codes: &[u32]) -> ExecutionError {
    ExecutionError::Structured(StructuredQueryError::new(
        statement,
        codes
            .iter()
            .map(|c| QueryErrorDesc::new(*c, format!("error {c}")))
            .collect(),
    ))
}

/// Push `tasks` through a pool of `workers` and return the drained table.
pub async fn run_tasks(
    engine: Arc<dyn QueryEngine>,
    workers: usize,
    names: Vec<Arc<str>>,
    tasks: Vec<Task>,
) -> StatsTable {
    let (task_tx, task_rx) = async_channel::bounded(workers * 2);
    let (result_tx, result_rx) = mpsc::channel(workers * 2);

    let aggregator = Aggregator::spawn(StatsTable::new(names), result_rx);
    let pool = WorkerPool::spawn(
        workers,
        engine,
        Arc::new(Classifier::default()),
        task_rx,
        result_tx,
    );

    for task in tasks {
        task_tx.send(task).await.expect("workers alive");
    }
    task_tx.close();

    let summary = pool.join().await;
    assert!(summary.lost_workers.is_empty(), "{summary:?}");
    aggregator.wait().await.expect("aggregator drains")
}
