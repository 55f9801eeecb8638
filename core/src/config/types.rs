use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub workload: WorkloadConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, write `app.log` and `engine.log` under `directory`.
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string for the console, e.g. "info" or "debug". The file sinks log at debug.
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Directory for the log files. If empty or unset, uses the working directory.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// Connection settings for the query service.
///
/// Credentials and trust material have no built-in values; they come from the
/// config file or the `QUERYMIX_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// PEM bundle to trust in addition to the system roots.
    #[serde(default)]
    pub ca_cert_path: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8093".to_string()
}

fn default_timeout_ms() -> u64 {
    75_000
}

fn default_ready_timeout_ms() -> u64 {
    30_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: None,
            password: None,
            ca_cert_path: None,
            timeout_ms: default_timeout_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Capacity of the task and result queues. Defaults to twice the worker count.
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    #[serde(default)]
    pub keyspace: KeyspaceConfig,

    #[serde(default = "default_read_queries")]
    pub read_queries: Vec<QueryDescriptor>,

    #[serde(default = "default_update_record")]
    pub update_record: RotatingQueryConfig,

    #[serde(default = "default_update_by_predicate")]
    pub update_by_predicate: RotatingQueryConfig,
}

fn default_workers() -> usize {
    10
}

fn default_duration_secs() -> u64 {
    15 * 60
}

impl WorkloadConfig {
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .filter(|c| *c > 0)
            .unwrap_or_else(|| self.workers.saturating_mul(2))
            .max(1)
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            duration_secs: default_duration_secs(),
            queue_capacity: None,
            keyspace: KeyspaceConfig::default(),
            read_queries: default_read_queries(),
            update_record: default_update_record(),
            update_by_predicate: default_update_by_predicate(),
        }
    }
}

/// Values substituted for `{bucket}` and `{scope}` in statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyspaceConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_bucket() -> String {
    "travel-sample".to_string()
}

fn default_scope() -> String {
    "inventory".to_string()
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            scope: default_scope(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub name: String,
    pub statement: String,
}

/// A write query whose single named parameter rotates through `targets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatingQueryConfig {
    pub name: String,
    pub statement: String,
    pub param: String,
    pub targets: Vec<String>,
}

fn default_read_queries() -> Vec<QueryDescriptor> {
    vec![
        QueryDescriptor {
            name: "Query 1 (Airline by ICAO)".to_string(),
            statement: "SELECT name, iata, icao, callsign, country FROM `{bucket}`.{scope}.airline WHERE icao = 'UAL';".to_string(),
        },
        QueryDescriptor {
            name: "Query 2 (Airport by FAA)".to_string(),
            statement: "SELECT airportname, city, country, faa FROM `{bucket}`.{scope}.airport WHERE faa = 'LAX';".to_string(),
        },
        QueryDescriptor {
            name: "Query 3 (All Routes)".to_string(),
            statement: "SELECT sourceairport, destinationairport, airline, stops, schedule FROM `{bucket}`.{scope}.route LIMIT 20;".to_string(),
        },
        QueryDescriptor {
            name: "Query 4 (Hotels in US)".to_string(),
            statement: "SELECT name, city, country, address, description FROM `{bucket}`.{scope}.hotel WHERE country = 'United States' LIMIT 20;".to_string(),
        },
    ]
}

fn default_update_record() -> RotatingQueryConfig {
    RotatingQueryConfig {
        name: "Query 5 (Update Airline)".to_string(),
        statement: "UPDATE `{bucket}`.{scope}.airline USE KEYS $id SET name = 'Couchbase Global Airways' RETURNING META().id;".to_string(),
        param: "id".to_string(),
        targets: [
            "airline_8091",
            "airline_5225",
            "airline_137",
            "airline_410",
            "airline_24",
            "airline_10",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
}

fn default_update_by_predicate() -> RotatingQueryConfig {
    RotatingQueryConfig {
        name: "Query 6 (Update Hotels)".to_string(),
        statement: "UPDATE `{bucket}`.{scope}.hotel SET amenities = ARRAY_APPEND(IFMISSING(amenities, []), 'Free WiFi') WHERE city = $city RETURNING META().id;".to_string(),
        param: "city".to_string(),
        targets: [
            "London",
            "Paris",
            "New York",
            "San Francisco",
            "Tokyo",
            "Los Angeles",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
}

/// Error codes that count as benign write-write contention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_conflict_code")]
    pub conflict_code: u32,

    #[serde(default = "default_aborted_code")]
    pub aborted_code: u32,
}

fn default_conflict_code() -> u32 {
    12009
}

fn default_aborted_code() -> u32 {
    1195
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            conflict_code: default_conflict_code(),
            aborted_code: default_aborted_code(),
        }
    }
}
