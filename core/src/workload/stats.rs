use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RunError;
use crate::APP_LOG_TARGET;

use super::task::{Outcome, QueryResult};

/// Counters for one query name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerQueryStats {
    pub success: u64,
    pub conflicts: u64,
    /// Failure detail → occurrences.
    pub failures: HashMap<String, u64>,
}

impl PerQueryStats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Conflict => self.conflicts += 1,
            Outcome::Failure(detail) => *self.failures.entry(detail).or_insert(0) += 1,
        }
    }

    pub fn failure_total(&self) -> u64 {
        self.failures.values().sum()
    }

    pub fn total_attempts(&self) -> u64 {
        self.success + self.conflicts + self.failure_total()
    }

    pub fn merge(&mut self, other: &PerQueryStats) {
        self.success += other.success;
        self.conflicts += other.conflicts;
        for (detail, count) in &other.failures {
            *self.failures.entry(detail.clone()).or_insert(0) += count;
        }
    }
}

/// Per-query stats in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    order: Vec<Arc<str>>,
    by_name: HashMap<Arc<str>, PerQueryStats>,
}

impl StatsTable {
    /// One empty entry per name, created before any result arrives.
    pub fn new(names: impl IntoIterator<Item = Arc<str>>) -> Self {
        let mut table = Self::default();
        for name in names {
            table.entry(name);
        }
        table
    }

    fn entry(&mut self, name: Arc<str>) -> &mut PerQueryStats {
        if !self.by_name.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.by_name.entry(name).or_default()
    }

    pub fn record(&mut self, result: QueryResult) {
        if !self.by_name.contains_key(&result.name) {
            tracing::warn!(
                target: APP_LOG_TARGET,
                query = %result.name,
                "result for a query outside the batch plan"
            );
        }
        self.entry(result.name).record(result.outcome);
    }

    pub fn get(&self, name: &str) -> Option<&PerQueryStats> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PerQueryStats)> {
        self.order
            .iter()
            .filter_map(|name| self.by_name.get(name).map(|s| (&**name, s)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sum of every entry.
    pub fn totals(&self) -> PerQueryStats {
        let mut total = PerQueryStats::default();
        for (_, stats) in self.iter() {
            total.merge(stats);
        }
        total
    }
}

/// Single consumer of the result queue. It owns its table outright; the
/// finished table comes back through [`Aggregator::wait`].
pub struct Aggregator {
    handle: JoinHandle<StatsTable>,
}

impl Aggregator {
    pub fn spawn(table: StatsTable, mut results: mpsc::Receiver<QueryResult>) -> Self {
        let handle = tokio::spawn(async move {
            let mut table = table;
            let mut drained = 0u64;
            while let Some(result) = results.recv().await {
                table.record(result);
                drained += 1;
            }
            tracing::debug!(target: APP_LOG_TARGET, drained, "result queue drained");
            table
        });
        Self { handle }
    }

    /// Blocks until the result queue is closed and fully drained.
    pub async fn wait(self) -> Result<StatsTable, RunError> {
        self.handle
            .await
            .map_err(|e| RunError::Aggregator(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names() -> Vec<Arc<str>> {
        vec![Arc::from("a"), Arc::from("b")]
    }

    #[test]
    fn entries_exist_before_results() {
        let table = StatsTable::new(names());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some(&PerQueryStats::default()));
    }

    #[test]
    fn failures_dedupe_by_exact_detail() {
        let mut s = PerQueryStats::default();
        s.record(Outcome::Failure("x".into()));
        s.record(Outcome::Failure("x".into()));
        s.record(Outcome::Failure("x ".into()));
        s.record(Outcome::Conflict);
        s.record(Outcome::Success);

        assert_eq!(s.failures.len(), 2);
        assert_eq!(s.failures["x"], 2);
        assert_eq!(s.failure_total(), 3);
        assert_eq!(s.total_attempts(), 5);
    }

    #[test]
    fn unknown_names_are_appended() {
        let mut table = StatsTable::new(names());
        table.record(QueryResult::new(Arc::from("c"), Outcome::Success));
        let order: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn totals_merge_failure_maps() {
        let mut table = StatsTable::new(names());
        table.record(QueryResult::new(Arc::from("a"), Outcome::Failure("e1".into())));
        table.record(QueryResult::new(Arc::from("b"), Outcome::Failure("e1".into())));
        table.record(QueryResult::new(Arc::from("b"), Outcome::Failure("e2".into())));
        table.record(QueryResult::new(Arc::from("a"), Outcome::Success));

        let totals = table.totals();
        assert_eq!(totals.success, 1);
        assert_eq!(totals.failures["e1"], 2);
        assert_eq!(totals.failures["e2"], 1);
    }

    #[tokio::test]
    async fn aggregator_drains_until_every_sender_is_gone() {
        let (tx, rx) = mpsc::channel(2);
        let agg = Aggregator::spawn(StatsTable::new(names()), rx);

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for _ in 0..25 {
                        let outcome = if i % 2 == 0 {
                            Outcome::Success
                        } else {
                            Outcome::Conflict
                        };
                        tx.send(QueryResult::new(Arc::from("a"), outcome))
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();
        drop(tx);
        for p in producers {
            p.await.unwrap();
        }

        let table = agg.wait().await.unwrap();
        let a = table.get("a").unwrap();
        assert_eq!(a.success, 50);
        assert_eq!(a.conflicts, 50);
        assert_eq!(table.get("b").unwrap().total_attempts(), 0);
    }
}
