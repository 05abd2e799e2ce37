//! Latency statistics.
//!
//! Samples are buffered in memory for the whole run and summarized once at
//! the end through an HDR histogram of microseconds. Five significant figures
//! keep every value below 262ms exact, so percentiles match the nearest-rank
//! method on the raw samples.

use hdrhistogram::Histogram;
use querybench_core::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Append-only sequence of per-iteration latencies.
#[derive(Debug, Clone, Default)]
pub struct Samples {
    durations: Vec<Duration>,
}

impl Samples {
    /// Create an empty sample set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sample set with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            durations: Vec::with_capacity(capacity),
        }
    }

    /// Record one sample.
    pub fn push(&mut self, duration: Duration) {
        self.durations.push(duration);
    }

    /// Number of samples recorded.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    /// Whether no sample was recorded.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Samples in recording order.
    pub fn as_slice(&self) -> &[Duration] {
        &self.durations
    }

    /// Sum of all samples.
    pub fn total(&self) -> Duration {
        self.durations.iter().sum()
    }
}

/// Latency at a given percentile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    /// Percentile in `[0, 100]`
    pub percentile: f64,
    /// Latency at that percentile
    pub value: Duration,
}

/// Latency distribution statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyDistribution {
    /// Minimum latency
    pub min: Duration,
    /// Maximum latency
    pub max: Duration,
    /// Mean latency
    pub mean: Duration,
    /// Population standard deviation
    pub std_dev: Duration,
    /// Requested percentiles, in the order they were asked for
    pub percentiles: Vec<Percentile>,
    /// Number of samples
    pub sample_count: usize,
}

impl LatencyDistribution {
    /// Summarize `samples`, computing each of `percentiles`.
    ///
    /// An empty slice yields a zeroed distribution with the requested
    /// percentiles all at zero.
    pub fn from_samples(samples: &[Duration], percentiles: &[f64]) -> Result<Self> {
        validate_percentiles(percentiles)?;

        if samples.is_empty() {
            return Ok(Self {
                percentiles: percentiles
                    .iter()
                    .map(|&p| Percentile {
                        percentile: p,
                        value: Duration::ZERO,
                    })
                    .collect(),
                ..Self::default()
            });
        }

        let histogram = histogram_of(samples)?;

        Ok(Self {
            min: Duration::from_micros(histogram.min()),
            max: Duration::from_micros(histogram.max()),
            mean: from_micros_f64(histogram.mean()),
            std_dev: from_micros_f64(histogram.stdev()),
            percentiles: percentiles
                .iter()
                .map(|&p| Percentile {
                    percentile: p,
                    value: Duration::from_micros(histogram.value_at_quantile(p / 100.0)),
                })
                .collect(),
            sample_count: samples.len(),
        })
    }

    /// Look up a computed percentile.
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        self.percentiles
            .iter()
            .find(|p| p.percentile == percentile)
            .map(|p| p.value)
    }
}

/// Significant figures kept by the latency histogram.
const SIGNIFICANT_FIGURES: u8 = 5;

/// Record `samples` (non-empty) into a histogram sized to their maximum.
fn histogram_of(samples: &[Duration]) -> Result<Histogram<u64>> {
    let high = samples.iter().copied().map(micros).max().unwrap_or(0).max(2);
    let mut histogram = Histogram::<u64>::new_with_max(high, SIGNIFICANT_FIGURES)
        .map_err(|e| BenchError::Configuration(format!("latency histogram: {:?}", e)))?;

    for &sample in samples {
        histogram
            .record(micros(sample))
            .map_err(|e| BenchError::Configuration(format!("latency histogram: {:?}", e)))?;
    }
    Ok(histogram)
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn from_micros_f64(micros: f64) -> Duration {
    Duration::from_nanos((micros * 1000.0).round() as u64)
}

/// Check that every percentile lies within `[0, 100]`.
pub fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    match percentiles
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 100.0)
    {
        Some(bad) => Err(BenchError::Configuration(format!(
            "percentile {} is outside [0, 100]",
            bad
        ))),
        None => Ok(()),
    }
}

/// Metric key for a percentile, e.g. `p50` or `p99.9`.
pub fn percentile_label(percentile: f64) -> String {
    format!("p{}", percentile)
}
