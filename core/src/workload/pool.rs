use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{ExecutionError, QueryEngine};
use crate::APP_LOG_TARGET;

use super::classify::Classifier;
use super::task::{Outcome, QueryResult, Task};

/// A fixed set of workers draining the shared task queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    /// Spawn `workers` workers (at least one).
    ///
    /// The pool owns the result sender; the result queue closes once every
    /// worker has exited.
    pub fn spawn(
        workers: usize,
        engine: Arc<dyn QueryEngine>,
        classifier: Arc<Classifier>,
        tasks: async_channel::Receiver<Task>,
        results: mpsc::Sender<QueryResult>,
    ) -> Self {
        let handles = (1..=workers.max(1))
            .map(|id| {
                let worker = Worker {
                    id,
                    engine: engine.clone(),
                    classifier: classifier.clone(),
                };
                let tasks = tasks.clone();
                let results = results.clone();
                tokio::spawn(async move { worker.run(tasks, results).await })
            })
            .collect();

        Self { handles }
    }

    #[cfg(test)]
    fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit.
    ///
    /// A worker that panicked is logged and listed in the summary; the
    /// others' counts are kept.
    pub async fn join(self) -> PoolSummary {
        let mut summary = PoolSummary::default();

        for (idx, res) in futures::future::join_all(self.handles)
            .await
            .into_iter()
            .enumerate()
        {
            match res {
                Ok(n) => summary.processed += n,
                Err(e) => {
                    tracing::error!(
                        target: APP_LOG_TARGET,
                        worker = idx + 1,
                        error = %e,
                        "worker did not finish; its in-flight task is not counted"
                    );
                    summary.lost_workers.push(idx + 1);
                }
            }
        }

        summary
    }
}

/// How the pool ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSummary {
    /// Tasks whose result was handed to the aggregator by surviving workers.
    pub processed: u64,
    /// Ids of workers that panicked.
    pub lost_workers: Vec<usize>,
}

struct Worker {
    id: usize,
    engine: Arc<dyn QueryEngine>,
    classifier: Arc<Classifier>,
}

impl Worker {
    async fn run(
        self,
        tasks: async_channel::Receiver<Task>,
        results: mpsc::Sender<QueryResult>,
    ) -> u64 {
        tracing::debug!(target: APP_LOG_TARGET, worker = self.id, "worker started");
        let mut processed = 0u64;

        while let Ok(task) = tasks.recv().await {
            let outcome = self.process(&task).await;
            if results
                .send(QueryResult::new(task.shared_name(), outcome))
                .await
                .is_err()
            {
                tracing::warn!(
                    target: APP_LOG_TARGET,
                    worker = self.id,
                    "result queue closed; worker exiting"
                );
                break;
            }
            processed += 1;
        }

        tracing::debug!(
            target: APP_LOG_TARGET,
            worker = self.id,
            processed,
            "worker finished"
        );
        processed
    }

    async fn process(&self, task: &Task) -> Outcome {
        let err = execute_and_drain(self.engine.as_ref(), task).await.err();
        let outcome = self.classifier.classify(err.as_ref());

        match &outcome {
            Outcome::Success => {}
            Outcome::Conflict => tracing::info!(
                target: APP_LOG_TARGET,
                worker = self.id,
                query = task.name(),
                outcome = outcome.as_str(),
                "worker recorded a CONFLICT"
            ),
            Outcome::Failure(detail) => tracing::warn!(
                target: APP_LOG_TARGET,
                worker = self.id,
                query = task.name(),
                outcome = outcome.as_str(),
                detail = %detail,
                "worker recorded a FAILURE"
            ),
        }

        outcome
    }
}

/// Run the task once and read every row. Row contents are discarded.
pub async fn execute_and_drain(
    engine: &dyn QueryEngine,
    task: &Task,
) -> Result<u64, ExecutionError> {
    let mut cursor = engine.execute(task.statement(), task.params()).await?;
    let mut rows = 0u64;
    while cursor.next_row().await?.is_some() {
        rows += 1;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NamedParams, RowCursor, VecCursor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingEngine {
        calls: AtomicU64,
    }

    #[async_trait]
    impl QueryEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        async fn execute(
            &self,
            statement: &str,
            _params: &NamedParams,
        ) -> Result<Box<dyn RowCursor>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match statement {
                "rows-then-error" => Ok(Box::new(VecCursor::with_trailing_error(
                    vec![json!(1), json!(2)],
                    ExecutionError::plain("stream reset mid-rows"),
                ))),
                "invoke-error" => Err(ExecutionError::plain("refused")),
                "panic" => panic!("engine bug"),
                _ => Ok(Box::new(VecCursor::new(vec![json!(1), json!(2), json!(3)]))),
            }
        }
    }

    fn engine() -> Arc<CountingEngine> {
        Arc::new(CountingEngine {
            calls: AtomicU64::new(0),
        })
    }

    #[tokio::test]
    async fn drain_counts_rows() {
        let e = engine();
        let rows = execute_and_drain(e.as_ref(), &Task::new("q", "SELECT 1"))
            .await
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn iteration_error_surfaces_after_rows() {
        let e = engine();
        let err = execute_and_drain(e.as_ref(), &Task::new("q", "rows-then-error"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::plain("stream reset mid-rows"));
    }

    #[tokio::test]
    async fn one_result_per_task_and_one_call_each() {
        let e = engine();
        let (task_tx, task_rx) = async_channel::bounded(4);
        let (result_tx, mut result_rx) = mpsc::channel(4);

        let pool = WorkerPool::spawn(
            3,
            e.clone(),
            Arc::new(Classifier::default()),
            task_rx,
            result_tx,
        );
        assert_eq!(pool.size(), 3);

        let feeder = tokio::spawn(async move {
            for stmt in ["ok", "invoke-error", "rows-then-error", "ok"] {
                task_tx.send(Task::new(stmt, stmt)).await.unwrap();
            }
            task_tx.close();
        });

        let collector = tokio::spawn(async move {
            let mut got = Vec::new();
            while let Some(r) = result_rx.recv().await {
                got.push(r);
            }
            got
        });

        feeder.await.unwrap();
        assert_eq!(pool.join().await, PoolSummary { processed: 4, lost_workers: vec![] });
        let results = collector.await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(e.calls.load(Ordering::SeqCst), 4);
        let failures = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failure(_)))
            .count();
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn zero_workers_still_spawns_one() {
        let (task_tx, task_rx) = async_channel::bounded::<Task>(1);
        let (result_tx, _result_rx) = mpsc::channel(1);
        let pool = WorkerPool::spawn(
            0,
            engine(),
            Arc::new(Classifier::default()),
            task_rx,
            result_tx,
        );
        assert_eq!(pool.size(), 1);
        task_tx.close();
        assert_eq!(pool.join().await.processed, 0);
    }

    #[tokio::test]
    async fn panicked_worker_is_reported_and_others_keep_draining() {
        let e = engine();
        let (task_tx, task_rx) = async_channel::bounded(8);
        let (result_tx, mut result_rx) = mpsc::channel(8);
        let pool = WorkerPool::spawn(
            2,
            e.clone(),
            Arc::new(Classifier::default()),
            task_rx,
            result_tx,
        );

        for stmt in ["ok", "panic", "ok", "ok", "ok"] {
            task_tx.send(Task::new(stmt, stmt)).await.unwrap();
        }
        task_tx.close();

        let summary = pool.join().await;
        assert_eq!(summary.lost_workers.len(), 1);

        let mut results = 0;
        while result_rx.recv().await.is_some() {
            results += 1;
        }
        assert_eq!(results, 4);
        assert_eq!(e.calls.load(Ordering::SeqCst), 5);
    }
}
