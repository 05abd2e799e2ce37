// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Query specification for a benchmark run.
//!
//! A [`QuerySpec`] is validated once when it is built and is immutable
//! afterwards; every iteration of a run reuses the same instance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::error::{BenchError, Result};

/// Timestamp format used for ISO 8601 query parameters.
const ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Inclusive time window a query is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, rejecting a start that lies after the end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(BenchError::Configuration(format!(
                "time range start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// The window of length `lookback` ending now.
    pub fn last(lookback: Duration) -> Result<Self> {
        let lookback = chrono::Duration::from_std(lookback).map_err(|e| {
            BenchError::Configuration(format!("lookback {:?} out of range: {}", lookback, e))
        })?;
        let end = Utc::now();
        Self::new(end - lookback, end)
    }

    /// Start of the window.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the window.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Start as nanoseconds since the Unix epoch.
    pub fn start_nanos(&self) -> Result<i64> {
        unix_nanos(self.start)
    }

    /// End as nanoseconds since the Unix epoch.
    pub fn end_nanos(&self) -> Result<i64> {
        unix_nanos(self.end)
    }

    /// Start as an ISO 8601 date-time in UTC with nanosecond precision.
    pub fn start_iso(&self) -> String {
        self.start.format(ISO_FORMAT).to_string()
    }

    /// End as an ISO 8601 date-time in UTC with nanosecond precision.
    pub fn end_iso(&self) -> String {
        self.end.format(ISO_FORMAT).to_string()
    }
}

fn unix_nanos(ts: DateTime<Utc>) -> Result<i64> {
    ts.timestamp_nanos_opt().ok_or_else(|| {
        BenchError::Configuration(format!(
            "timestamp {} cannot be represented in epoch nanoseconds",
            ts.to_rfc3339()
        ))
    })
}

/// What a run asks the backend for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySpec {
    query: String,
    range: TimeRange,
    limit: Option<u32>,
    params: Vec<(String, String)>,
}

impl QuerySpec {
    /// Create a query spec. The query text must contain something other than
    /// whitespace.
    pub fn new(query: impl Into<String>, range: TimeRange) -> Result<Self> {
        let query = query.into();
        ensure_query(&query)?;
        Ok(Self {
            query,
            range,
            limit: None,
            params: Vec::new(),
        })
    }

    /// Set the maximum number of results the backend should return.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Append an extra backend-specific query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Query text (LogQL, SQL, ...).
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Time window of the query.
    pub fn range(&self) -> &TimeRange {
        &self.range
    }

    /// Result limit, if any.
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Extra parameters in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Reject empty or whitespace-only query text.
pub fn ensure_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(BenchError::Configuration(
            "query must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_query_rejected() {
        let err = QuerySpec::new("", fixed_range()).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));

        let err = QuerySpec::new("  \n\t", fixed_range()).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert!(matches!(
            TimeRange::new(start, end),
            Err(BenchError::Configuration(_))
        ));
        assert!(TimeRange::new(start, start).is_ok());
    }

    #[test]
    fn test_nanos_and_iso() {
        let range = fixed_range();
        assert_eq!(range.start_nanos().unwrap(), 1_714_557_600_000_000_000);
        assert_eq!(range.end_nanos().unwrap(), 1_714_561_200_000_000_000);
        assert_eq!(range.start_iso(), "2024-05-01 10:00:00.000000000");
        assert_eq!(range.end_iso(), "2024-05-01 11:00:00.000000000");
    }

    #[test]
    fn test_nanos_out_of_range() {
        let far = Utc.with_ymd_and_hms(2500, 1, 1, 0, 0, 0).unwrap();
        let range = TimeRange::new(far, far).unwrap();
        assert!(matches!(
            range.start_nanos(),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn test_last_window() {
        let range = TimeRange::last(Duration::from_secs(3600)).unwrap();
        assert_eq!(
            (range.end() - range.start()).num_seconds(),
            3600
        );
    }

    #[test]
    fn test_builder_keeps_param_order() {
        let spec = QuerySpec::new("{service=\"x\"}", fixed_range())
            .unwrap()
            .with_limit(5000)
            .with_param("direction", "backward")
            .with_param("step", "60s");

        assert_eq!(spec.limit(), Some(5000));
        assert_eq!(
            spec.params(),
            &[
                ("direction".to_string(), "backward".to_string()),
                ("step".to_string(), "60s".to_string()),
            ]
        );
    }
}
