//! Timed load run: dispatch → worker pool → classify → aggregate → report.
//!
//! ```text
//! Dispatcher ──(bounded task queue)──▶ WorkerPool × W ──(bounded result queue)──▶ Aggregator
//!                                        │ execute + drain rows                         │
//!                                        └─ Classifier                                  ▼
//!                                                                                 RunReport
//! ```

mod classify;
mod dispatcher;
mod pool;
mod progress;
mod report;
mod run;
mod stats;
mod task;

pub use classify::Classifier;
pub use dispatcher::{DispatchSummary, Dispatcher};
pub use pool::{execute_and_drain, PoolSummary, WorkerPool};
pub use progress::ProgressMonitor;
pub use report::{
    build_report, format_text, success_rate, throughput, FailureCount, QuerySummary, RunMeta,
    RunReport,
};
pub use run::{run_workload, RunOptions};
pub use stats::{Aggregator, PerQueryStats, StatsTable};
pub use task::{render_statement, BatchPlan, Outcome, QueryResult, RotatingQuery, Task};
