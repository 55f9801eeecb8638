use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::{KeyspaceConfig, RotatingQueryConfig, WorkloadConfig};
use crate::engine::NamedParams;

/// One unit of work. Cheap to clone; the name and statement are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    name: Arc<str>,
    statement: Arc<str>,
    params: NamedParams,
}

impl Task {
    pub fn new(name: impl Into<Arc<str>>, statement: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            statement: statement.into(),
            params: NamedParams::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn params(&self) -> &NamedParams {
        &self.params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Conflict,
    Failure(String),
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Conflict => "conflict",
            Self::Failure(_) => "failure",
        }
    }
}

/// The classified outcome of one executed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub name: Arc<str>,
    pub outcome: Outcome,
}

impl QueryResult {
    pub fn new(name: Arc<str>, outcome: Outcome) -> Self {
        Self { name, outcome }
    }
}

/// A write query whose single parameter cycles through a fixed target pool.
#[derive(Debug, Clone)]
pub struct RotatingQuery {
    name: Arc<str>,
    statement: Arc<str>,
    param: String,
    targets: Vec<Value>,
}

impl RotatingQuery {
    pub fn new(
        name: impl Into<Arc<str>>,
        statement: impl Into<Arc<str>>,
        param: impl Into<String>,
        targets: Vec<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            statement: statement.into(),
            param: param.into(),
            targets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn targets(&self) -> &[Value] {
        &self.targets
    }

    /// Task aimed at `targets[counter % len]`. An empty pool yields a task
    /// without the parameter.
    pub fn task_for(&self, counter: u64) -> Task {
        let task = Task {
            name: self.name.clone(),
            statement: self.statement.clone(),
            params: NamedParams::new(),
        };
        if self.targets.is_empty() {
            return task;
        }
        let idx = (counter % self.targets.len() as u64) as usize;
        task.with_param(self.param.clone(), self.targets[idx].clone())
    }

    fn from_config(cfg: &RotatingQueryConfig, keyspace: &KeyspaceConfig) -> Self {
        Self::new(
            cfg.name.as_str(),
            render_statement(&cfg.statement, keyspace),
            cfg.param.clone(),
            cfg.targets.iter().cloned().map(Value::String).collect(),
        )
    }
}

/// The fixed mix emitted once per batch: every read, then the record update,
/// then the predicate update.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub reads: Vec<Task>,
    pub update_record: RotatingQuery,
    pub update_by_predicate: RotatingQuery,
}

impl BatchPlan {
    pub fn from_config(cfg: &WorkloadConfig) -> Self {
        let reads = cfg
            .read_queries
            .iter()
            .map(|q| Task::new(q.name.as_str(), render_statement(&q.statement, &cfg.keyspace)))
            .collect();

        Self {
            reads,
            update_record: RotatingQuery::from_config(&cfg.update_record, &cfg.keyspace),
            update_by_predicate: RotatingQuery::from_config(
                &cfg.update_by_predicate,
                &cfg.keyspace,
            ),
        }
    }

    /// Task names in dispatch order.
    pub fn task_names(&self) -> Vec<Arc<str>> {
        self.reads
            .iter()
            .map(Task::shared_name)
            .chain([
                self.update_record.name.clone(),
                self.update_by_predicate.name.clone(),
            ])
            .collect()
    }

    pub fn batch_len(&self) -> usize {
        self.reads.len() + 2
    }

    pub fn batch(&self, counter: u64) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.batch_len());
        tasks.extend(self.reads.iter().cloned());
        tasks.push(self.update_record.task_for(counter));
        tasks.push(self.update_by_predicate.task_for(counter));
        tasks
    }
}

pub fn render_statement(template: &str, keyspace: &KeyspaceConfig) -> String {
    template
        .replace("{bucket}", &keyspace.bucket)
        .replace("{scope}", &keyspace.scope)
}
