use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stats::{PerQueryStats, StatsTable};

/// `success / denominator` as a percentage, or 0 when there is nothing to divide by.
pub fn success_rate(success: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    success as f64 / denominator as f64 * 100.0
}

/// Dispatched tasks per second, or 0 for a zero-length run.
pub fn throughput(dispatched: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    dispatched as f64 / secs
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureCount {
    pub detail: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    pub name: String,
    pub successes: u64,
    pub conflicts: u64,
    pub failures: u64,
    pub total: u64,
    /// Conflicts counted as failures.
    pub success_rate_conflicts_as_failures: f64,
    /// Conflicts removed from numerator and denominator.
    pub success_rate_conflicts_ignored: f64,
    pub failure_breakdown: Vec<FailureCount>,
}

impl QuerySummary {
    pub fn from_stats(name: impl Into<String>, stats: &PerQueryStats) -> Self {
        let failures = stats.failure_total();
        let total = stats.total_attempts();

        let mut failure_breakdown: Vec<FailureCount> = stats
            .failures
            .iter()
            .map(|(detail, count)| FailureCount {
                detail: detail.clone(),
                count: *count,
            })
            .collect();
        failure_breakdown.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.detail.cmp(&b.detail))
        });

        Self {
            name: name.into(),
            successes: stats.success,
            conflicts: stats.conflicts,
            failures,
            total,
            success_rate_conflicts_as_failures: success_rate(stats.success, total),
            success_rate_conflicts_ignored: success_rate(stats.success, stats.success + failures),
            failure_breakdown,
        }
    }
}

/// Run-level facts that do not come from the stats table.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub started_at: DateTime<Utc>,
    pub workers: usize,
    pub configured_duration: Duration,
    pub dispatched: u64,
    /// Dispatcher start to worker-pool join.
    pub elapsed: Duration,
    /// Workers that panicked; their in-flight tasks have no result.
    pub lost_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub workers: usize,
    pub configured_duration_secs: u64,
    pub queries: Vec<QuerySummary>,
    pub overall: QuerySummary,
    pub dispatched: u64,
    pub elapsed_secs: f64,
    pub qps: f64,
    pub lost_workers: usize,
}

pub fn build_report(table: &StatsTable, meta: &RunMeta) -> RunReport {
    let queries = table
        .iter()
        .map(|(name, stats)| QuerySummary::from_stats(name, stats))
        .collect();

    RunReport {
        started_at: meta.started_at,
        workers: meta.workers,
        configured_duration_secs: meta.configured_duration.as_secs(),
        queries,
        overall: QuerySummary::from_stats("Overall", &table.totals()),
        dispatched: meta.dispatched,
        elapsed_secs: meta.elapsed.as_secs_f64(),
        qps: throughput(meta.dispatched, meta.elapsed),
        lost_workers: meta.lost_workers,
    }
}

pub fn format_text(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n--- Query Execution Summary ---");
    for q in &report.queries {
        let _ = writeln!(
            out,
            "\n{}: Successes={}, Conflicts={}, Failures={}, Total={}",
            q.name, q.successes, q.conflicts, q.failures, q.total
        );
        write_rates(&mut out, q, "");
        write_breakdown(&mut out, q);
    }

    let o = &report.overall;
    let _ = writeln!(out, "\n--- Overall Summary ---");
    let _ = writeln!(
        out,
        "Totals: Successes={}, Conflicts={}, Failures={}, Total Attempts={}",
        o.successes, o.conflicts, o.failures, o.total
    );
    write_rates(&mut out, o, "Overall ");
    write_breakdown(&mut out, o);

    let _ = writeln!(
        out,
        "\nTotal Queries Dispatched: {} in {:.2} seconds",
        report.dispatched, report.elapsed_secs
    );
    let _ = writeln!(out, "Achieved QPS (Queries Per Second): {:.2}", report.qps);
    if report.lost_workers > 0 {
        let _ = writeln!(
            out,
            "Workers lost to panics: {} (their in-flight tasks are not counted)",
            report.lost_workers
        );
    }
    out
}

fn write_rates(out: &mut String, q: &QuerySummary, prefix: &str) {
    let _ = writeln!(
        out,
        "    ├─ {}Success Rate (conflicts as failures): {:.2}%",
        prefix, q.success_rate_conflicts_as_failures
    );
    let _ = writeln!(
        out,
        "    └─ {}Success Rate (conflicts ignored):      {:.2}%",
        prefix, q.success_rate_conflicts_ignored
    );
}

fn write_breakdown(out: &mut String, q: &QuerySummary) {
    if q.failure_breakdown.is_empty() {
        return;
    }
    let _ = writeln!(out, "    └─ Failure Breakdown:");
    for f in &q.failure_breakdown {
        let _ = writeln!(out, "        - [{} times] {}", f.count, f.detail);
    }
}
