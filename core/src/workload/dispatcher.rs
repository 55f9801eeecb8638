use std::time::{Duration, Instant};

use crate::APP_LOG_TARGET;

use super::progress::ProgressMonitor;
use super::task::{BatchPlan, Task};

/// What the dispatcher did before it closed the task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub batches: u64,
    pub dispatched: u64,
}

/// Emits the batch mix onto the task queue until the run duration is used up.
pub struct Dispatcher {
    plan: BatchPlan,
    counter: u64,
    dispatched: u64,
    progress: ProgressMonitor,
}

impl Dispatcher {
    pub fn new(plan: BatchPlan) -> Self {
        Self {
            plan,
            counter: 0,
            dispatched: 0,
            progress: ProgressMonitor::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressMonitor) -> Self {
        self.progress = progress;
        self
    }

    /// Advance the rotation counter and build the next batch.
    ///
    /// The counter is bumped before indexing, so the first batch targets
    /// index 1 of each pool.
    pub fn next_batch(&mut self) -> Vec<Task> {
        self.counter += 1;
        self.plan.batch(self.counter)
    }

    /// Dispatch whole batches while `start.elapsed() < duration`.
    ///
    /// The deadline is checked only between batches. The queue is closed on
    /// return, which is the workers' only stop signal.
    pub async fn run(
        mut self,
        tasks: async_channel::Sender<Task>,
        start: Instant,
        duration: Duration,
    ) -> DispatchSummary {
        let mut batches = 0u64;

        'dispatch: while start.elapsed() < duration {
            for task in self.next_batch() {
                if tasks.send(task).await.is_err() {
                    tracing::warn!(
                        target: APP_LOG_TARGET,
                        dispatched = self.dispatched,
                        "task queue closed before the deadline; stopping dispatch"
                    );
                    break 'dispatch;
                }
                self.dispatched += 1;
            }
            batches += 1;
            self.progress.record_batch(start.elapsed(), self.dispatched);
        }

        tasks.close();
        tracing::info!(
            target: APP_LOG_TARGET,
            batches,
            dispatched = self.dispatched,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dispatch finished, task queue closed"
        );

        DispatchSummary {
            batches,
            dispatched: self.dispatched,
        }
    }
}
