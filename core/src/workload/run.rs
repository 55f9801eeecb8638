use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::config::WorkloadConfig;
use crate::engine::QueryEngine;
use crate::error::RunError;
use crate::APP_LOG_TARGET;

use super::classify::Classifier;
use super::dispatcher::Dispatcher;
use super::pool::WorkerPool;
use super::progress::ProgressMonitor;
use super::report::{build_report, RunMeta, RunReport};
use super::stats::{Aggregator, StatsTable};
use super::task::BatchPlan;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workers: usize,
    pub duration: Duration,
    pub queue_capacity: usize,
    pub progress: bool,
}

impl RunOptions {
    pub fn from_config(cfg: &WorkloadConfig) -> Self {
        Self {
            workers: cfg.workers,
            duration: Duration::from_secs(cfg.duration_secs),
            queue_capacity: cfg.effective_queue_capacity(),
            progress: false,
        }
    }
}

/// Run the whole pipeline for `opts.duration` and build the report.
///
/// Shutdown order: the dispatcher closes the task queue, the worker pool is
/// joined (dropping the last result sender), then the aggregator hands back
/// its table.
pub async fn run_workload(
    engine: Arc<dyn QueryEngine>,
    plan: BatchPlan,
    classifier: Classifier,
    opts: &RunOptions,
) -> Result<RunReport, RunError> {
    let workers = opts.workers.max(1);
    let capacity = opts.queue_capacity.max(1);

    let (task_tx, task_rx) = async_channel::bounded(capacity);
    let (result_tx, result_rx) = mpsc::channel(capacity);

    let aggregator = Aggregator::spawn(StatsTable::new(plan.task_names()), result_rx);
    let pool = WorkerPool::spawn(workers, engine, Arc::new(classifier), task_rx, result_tx);

    let progress = ProgressMonitor::new(opts.duration, opts.progress);
    let dispatcher = Dispatcher::new(plan).with_progress(progress.clone());

    let started_at = Utc::now();
    let start = Instant::now();
    let summary = tokio::spawn(dispatcher.run(task_tx, start, opts.duration))
        .await
        .map_err(|e| RunError::Dispatcher(e.to_string()))?;

    progress.set_message("time limit reached, waiting for workers...");
    tracing::info!(
        target: APP_LOG_TARGET,
        dispatched = summary.dispatched,
        "time limit reached; waiting for workers to finish"
    );

    let pool_summary = pool.join().await;
    let elapsed = start.elapsed();
    let table = aggregator.wait().await?;
    progress.clear();

    if !pool_summary.lost_workers.is_empty() {
        tracing::warn!(
            lost_workers = ?pool_summary.lost_workers,
            "workers panicked; the report covers the results that were delivered"
        );
    }
    if pool_summary.processed != summary.dispatched {
        tracing::warn!(
            processed = pool_summary.processed,
            dispatched = summary.dispatched,
            "processed count differs from dispatched count"
        );
    }

    Ok(build_report(
        &table,
        &RunMeta {
            started_at,
            workers,
            configured_duration: opts.duration,
            dispatched: summary.dispatched,
            elapsed,
            lost_workers: pool_summary.lost_workers.len(),
        },
    ))
}
