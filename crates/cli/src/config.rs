//! Layered configuration.
//!
//! Built-in defaults, then an optional TOML file, then `QUERYBENCH_*`
//! environment variables (`QUERYBENCH_LOKI__BASE_URL`, `QUERYBENCH_RUN__ITERATIONS`, ...).
//! Command-line flags are applied on top by the `run` command.

use querybench_benchmarks::{FailurePolicy, OutputFormat, RunPlan, TransportConfig, DEFAULT_PERCENTILES};
use querybench_core::{Headers, QuerySpec, Result as BenchResult, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "QUERYBENCH";

/// Complete benchmark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Loki targets
    pub loki: LokiConfig,
    /// ClickHouse target
    pub clickhouse: ClickHouseConfig,
    /// Loop parameters
    pub run: RunConfig,
    /// Result files
    pub output: OutputConfig,
}

/// Loki connection and query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LokiConfig {
    /// Base URL of the Loki HTTP API
    pub base_url: String,
    /// LogQL query
    pub query: String,
    /// `limit` sent to `query_range`
    pub limit: Option<u32>,
    /// Value of the `X-Scope-OrgID` header
    pub tenant: Option<String>,
    /// Additional headers
    pub headers: Headers,
    /// Additional query parameters (`direction`, `step`, ...)
    pub params: BTreeMap<String, String>,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3100".to_string(),
            query: r#"{service_name="unknown_service"}"#.to_string(),
            limit: Some(5000),
            tenant: Some("tenant1".to_string()),
            headers: Headers::new(),
            params: BTreeMap::new(),
        }
    }
}

/// ClickHouse connection and query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    /// Base URL of the ClickHouse HTTP interface
    pub base_url: String,
    /// SQL query
    pub query: String,
    /// Value of the `X-Scope-OrgID` header
    pub tenant: Option<String>,
    /// Additional headers
    pub headers: Headers,
    /// Extra or overriding query settings
    pub settings: BTreeMap<String, String>,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8123".to_string(),
            query: "SELECT * FROM default.otel_logs WHERE ServiceName = 'unknown_service' LIMIT 5000"
                .to_string(),
            tenant: Some("tenant1".to_string()),
            headers: Headers::new(),
            settings: BTreeMap::new(),
        }
    }
}

/// Timed loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fixed iteration count; calibrate to `bench_time_ms` when unset
    pub iterations: Option<u64>,
    /// Calibration target per run, in milliseconds
    pub bench_time_ms: u64,
    /// Calibration ceiling
    pub max_iterations: u64,
    /// Per-request timeout, in seconds
    pub timeout_secs: u64,
    /// Query window ending now, in seconds
    pub lookback_secs: u64,
    /// Reported percentiles
    pub percentiles: Vec<f64>,
    /// Count failures instead of aborting
    pub continue_on_error: bool,
    /// Fetch Loki index stats before the Loki runs
    pub probe: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: None,
            bench_time_ms: 1000,
            max_iterations: 1_000_000,
            timeout_secs: 30,
            lookback_secs: 3600,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            continue_on_error: false,
            probe: true,
        }
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory
    pub dir: PathBuf,
    /// Files to write
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(querybench_benchmarks::io::OUTPUT_DIR),
            format: OutputFormat::Both,
        }
    }
}

impl BenchConfig {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Query window ending now.
    pub fn time_range(&self) -> BenchResult<TimeRange> {
        TimeRange::last(Duration::from_secs(self.run.lookback_secs))
    }

    /// Loki query over `range`.
    pub fn loki_spec(&self, range: TimeRange) -> BenchResult<QuerySpec> {
        let mut spec = QuerySpec::new(self.loki.query.clone(), range)?;
        if let Some(limit) = self.loki.limit {
            spec = spec.with_limit(limit);
        }
        for (name, value) in &self.loki.params {
            spec = spec.with_param(name.clone(), value.clone());
        }
        Ok(spec)
    }

    /// ClickHouse query over `range`.
    pub fn clickhouse_spec(&self, range: TimeRange) -> BenchResult<QuerySpec> {
        QuerySpec::new(self.clickhouse.query.clone(), range)
    }

    /// Headers for Loki requests.
    pub fn loki_headers(&self) -> Headers {
        backend_headers(self.loki.tenant.as_deref(), &self.loki.headers)
    }

    /// Headers for ClickHouse requests.
    pub fn clickhouse_headers(&self) -> Headers {
        backend_headers(self.clickhouse.tenant.as_deref(), &self.clickhouse.headers)
    }

    /// Loop parameters.
    pub fn run_plan(&self) -> RunPlan {
        let plan = match self.run.iterations {
            Some(n) => RunPlan::fixed(n),
            None => RunPlan::calibrated(
                Duration::from_millis(self.run.bench_time_ms),
                self.run.max_iterations,
            ),
        };
        let policy = if self.run.continue_on_error {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        };
        plan.with_policy(policy)
            .with_percentiles(self.run.percentiles.clone())
    }

    /// HTTP client settings.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(Duration::from_secs(self.run.timeout_secs))
    }
}

fn backend_headers(tenant: Option<&str>, extra: &Headers) -> Headers {
    let mut headers = match tenant {
        Some(tenant) => Headers::tenant(tenant),
        None => Headers::new(),
    };
    headers.extend(extra);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybench_benchmarks::Iterations;
    use std::io::Write;

    #[test]
    fn test_defaults_mirror_local_stack() {
        let config = BenchConfig::default();
        assert_eq!(config.loki.base_url, "http://localhost:3100");
        assert_eq!(config.loki.limit, Some(5000));
        assert_eq!(config.loki_headers().get("X-Scope-OrgID"), Some("tenant1"));
        assert_eq!(config.clickhouse.base_url, "http://localhost:8123");
        assert_eq!(config.run.timeout_secs, 30);
        assert_eq!(config.output.format, OutputFormat::Both);
    }

    #[test]
    fn test_default_plan_calibrates() {
        let plan = BenchConfig::default().run_plan();
        assert_eq!(
            plan.iterations,
            Iterations::Calibrated {
                bench_time: Duration::from_secs(1),
                max_iterations: 1_000_000,
            }
        );
        assert_eq!(plan.policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[loki]
base_url = "http://loki.internal:3100"
tenant = "team-a"

[loki.headers]
Authorization = "Basic dXNlcjpwYXNz"

[loki.params]
direction = "backward"

[clickhouse]
query = "SELECT count() FROM otel_logs"

[clickhouse.settings]
max_threads = "4"

[run]
iterations = 25
continue_on_error = true
percentiles = [50.0, 99.9]

[output]
dir = "/tmp/querybench"
format = "json"
"#
        )
        .unwrap();

        let config = BenchConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.loki.base_url, "http://loki.internal:3100");
        assert_eq!(config.loki.query, r#"{service_name="unknown_service"}"#);
        let headers = config.loki_headers();
        assert_eq!(headers.get("X-Scope-OrgID"), Some("team-a"));
        // Header names are matched case-insensitively on the wire.
        let auth = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value);
        assert_eq!(auth, Some("Basic dXNlcjpwYXNz"));
        assert_eq!(config.clickhouse.settings.get("max_threads").map(String::as_str), Some("4"));
        assert_eq!(config.output.format, OutputFormat::Json);

        let plan = config.run_plan();
        assert_eq!(plan.iterations, Iterations::Fixed(25));
        assert_eq!(plan.policy, FailurePolicy::Continue);
        assert_eq!(plan.percentiles, vec![50.0, 99.9]);

        let spec = config.loki_spec(config.time_range().unwrap()).unwrap();
        assert_eq!(spec.params(), &[("direction".to_string(), "backward".to_string())]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(BenchConfig::load(Some(Path::new("/nonexistent/querybench.toml"))).is_err());
    }

    #[test]
    fn test_no_tenant() {
        let mut config = BenchConfig::default();
        config.clickhouse.tenant = None;
        assert!(config.clickhouse_headers().is_empty());
    }

    #[test]
    fn test_empty_query_rejected() {
        let mut config = BenchConfig::default();
        config.clickhouse.query = String::new();
        let range = config.time_range().unwrap();
        assert!(config.clickhouse_spec(range).is_err());
    }
}
