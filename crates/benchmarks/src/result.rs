//! Benchmark result types.
//!
//! [`RunResult`] is the typed outcome of one run; [`BenchmarkResult`] is the
//! flattened, serializable form written to disk and rendered in reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::stats::{percentile_label, LatencyDistribution};

/// Canonical benchmark result structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Unique identifier for the benchmark target.
    pub target_id: String,
    /// Metrics data in JSON format.
    pub metrics: serde_json::Value,
    /// Timestamp when the benchmark was executed.
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Create a new BenchmarkResult.
    pub fn new(target_id: impl Into<String>, metrics: serde_json::Value) -> Self {
        Self {
            target_id: target_id.into(),
            metrics,
            timestamp: Utc::now(),
        }
    }

    /// Read a numeric metric.
    pub fn metric_f64(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(Value::as_f64)
    }
}

/// Outcome of one completed run. Never mutated after the run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier of this run, also attached to its log lines
    pub run_id: Uuid,
    /// Benchmark target the run measured
    pub target_id: String,
    /// When the measured pass started
    pub started_at: DateTime<Utc>,
    /// Iterations attempted in the measured pass
    pub iterations: u64,
    /// Iterations that failed (always zero when failures abort the run)
    pub failures: u64,
    /// Sum of all sample latencies
    pub total: Duration,
    /// Wall-clock time of the measured pass
    pub wall_time: Duration,
    /// Latency statistics over successful iterations
    pub distribution: LatencyDistribution,
    /// Response body bytes drained over successful iterations
    pub bytes_received: u64,
}

impl RunResult {
    /// Number of latency samples recorded.
    pub fn samples(&self) -> usize {
        self.distribution.sample_count
    }

    /// Mean latency.
    pub fn mean(&self) -> Duration {
        self.distribution.mean
    }

    /// Flatten into a JSON object with millisecond values.
    pub fn to_metrics(&self) -> Value {
        let mut metrics = Map::new();
        metrics.insert("run_id".into(), Value::from(self.run_id.to_string()));
        metrics.insert("iterations".into(), Value::from(self.iterations));
        metrics.insert("failures".into(), Value::from(self.failures));
        metrics.insert("samples".into(), Value::from(self.samples() as u64));
        metrics.insert("total_ms".into(), Value::from(millis(self.total)));
        metrics.insert("wall_time_ms".into(), Value::from(millis(self.wall_time)));
        metrics.insert("mean_ms".into(), Value::from(millis(self.distribution.mean)));
        metrics.insert("min_ms".into(), Value::from(millis(self.distribution.min)));
        metrics.insert("max_ms".into(), Value::from(millis(self.distribution.max)));
        metrics.insert(
            "std_dev_ms".into(),
            Value::from(millis(self.distribution.std_dev)),
        );
        for p in &self.distribution.percentiles {
            metrics.insert(
                format!("{}_ms", percentile_label(p.percentile)),
                Value::from(millis(p.value)),
            );
        }
        metrics.insert("bytes_received".into(), Value::from(self.bytes_received));
        Value::Object(metrics)
    }

    /// Convert into the canonical result written to disk.
    pub fn into_benchmark_result(self) -> BenchmarkResult {
        BenchmarkResult {
            metrics: self.to_metrics(),
            timestamp: self.started_at,
            target_id: self.target_id,
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
