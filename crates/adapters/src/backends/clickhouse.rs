// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! ClickHouse HTTP interface.
//!
//! The raw SQL goes in the `query` parameter of a GET on the root endpoint,
//! followed by per-query settings. Result limits belong in the SQL itself.

use once_cell::sync::Lazy;
use querybench_core::query::ensure_query;
use querybench_core::{PreparedRequest, QuerySpec, Result};
use regex::Regex;
use url::Url;

use super::{endpoint_url, parse_base_url, QueryBackend};

/// Settings sent with every query unless overridden.
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("date_time_output_format", "iso"),
    ("wait_end_of_query", "0"),
    ("cancel_http_readonly_queries_on_client_close", "1"),
    ("min_bytes_to_use_direct_io", "1"),
];

/// `{start:Type}` / `{end:Type}` query parameter placeholders.
static TIME_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*(start|end)\s*:").expect("placeholder pattern is valid"));

/// Request builder for the ClickHouse HTTP interface.
#[derive(Debug, Clone)]
pub struct ClickHouseBackend {
    base_url: Url,
    settings: Vec<(String, String)>,
}

impl ClickHouseBackend {
    /// Builder for the ClickHouse server at `base_url` with [`DEFAULT_SETTINGS`].
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            settings: DEFAULT_SETTINGS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    /// Add a setting, replacing the value of an existing one.
    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.settings.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value,
            None => self.settings.push((name, value)),
        }
        self
    }

    /// Settings in the order they are sent.
    pub fn settings(&self) -> &[(String, String)] {
        &self.settings
    }
}

impl QueryBackend for ClickHouseBackend {
    fn name(&self) -> &str {
        "clickhouse"
    }

    fn build_request(&self, spec: &QuerySpec) -> Result<PreparedRequest> {
        ensure_query(spec.query())?;

        let (uses_start, uses_end) = TIME_PLACEHOLDER
            .captures_iter(spec.query())
            .fold((false, false), |(start, end), caps| match &caps[1] {
                "start" => (true, end),
                _ => (start, true),
            });

        let mut url = endpoint_url(&self.base_url, "/");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", spec.query());
            for (name, value) in &self.settings {
                pairs.append_pair(name, value);
            }
            if uses_start {
                pairs.append_pair("param_start", &spec.range().start_iso());
            }
            if uses_end {
                pairs.append_pair("param_end", &spec.range().end_iso());
            }
            for (name, value) in spec.params() {
                pairs.append_pair(name, value);
            }
        }

        Ok(PreparedRequest::new(url, "query"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use querybench_core::TimeRange;

    fn spec(sql: &str) -> QuerySpec {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
        )
        .unwrap();
        QuerySpec::new(sql, range).unwrap()
    }

    #[test]
    fn test_default_request() {
        let spec = spec("SELECT * FROM default.otel_logs WHERE ServiceName = 'unknown_service' LIMIT 5000")
            .with_limit(10);
        let request = ClickHouseBackend::new("http://localhost:8123")
            .unwrap()
            .build_request(&spec)
            .unwrap();

        assert_eq!(request.url.path(), "/");
        assert_eq!(
            request.query_string(),
            "query=SELECT+*+FROM+default.otel_logs+WHERE+ServiceName+%3D+%27unknown_service%27+LIMIT+5000\
             &date_time_output_format=iso\
             &wait_end_of_query=0\
             &cancel_http_readonly_queries_on_client_close=1\
             &min_bytes_to_use_direct_io=1"
        );
        assert!(!request.query_string().contains("limit="));
    }

    #[test]
    fn test_time_placeholders_add_params() {
        let spec = spec(
            "SELECT count() FROM otel_logs WHERE Timestamp BETWEEN {start:DateTime64(9)} AND {end: DateTime64(9)}",
        );
        let request = ClickHouseBackend::new("http://localhost:8123")
            .unwrap()
            .build_request(&spec)
            .unwrap();

        let pairs: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&(
            "param_start".to_string(),
            "2024-05-01 10:00:00.000000000".to_string()
        )));
        assert!(pairs.contains(&(
            "param_end".to_string(),
            "2024-05-01 11:00:00.000000000".to_string()
        )));
    }

    #[test]
    fn test_no_time_params_without_placeholders() {
        let request = ClickHouseBackend::new("http://localhost:8123")
            .unwrap()
            .build_request(&spec("SELECT 1"))
            .unwrap();
        assert!(!request.query_string().contains("param_"));
    }

    #[test]
    fn test_setting_override_keeps_position() {
        let backend = ClickHouseBackend::new("http://localhost:8123")
            .unwrap()
            .with_setting("wait_end_of_query", "1")
            .with_setting("max_threads", "4");

        assert_eq!(backend.settings().len(), DEFAULT_SETTINGS.len() + 1);
        assert_eq!(
            backend.settings()[1],
            ("wait_end_of_query".to_string(), "1".to_string())
        );

        let request = backend
            .build_request(&spec("SELECT 1").with_param("user", "bench"))
            .unwrap();
        assert_eq!(
            request.query_string(),
            "query=SELECT+1\
             &date_time_output_format=iso\
             &wait_end_of_query=1\
             &cancel_http_readonly_queries_on_client_close=1\
             &min_bytes_to_use_direct_io=1\
             &max_threads=4\
             &user=bench"
        );
    }

    #[test]
    fn test_base_url_with_path() {
        let request = ClickHouseBackend::new("https://ch.example.com/http/")
            .unwrap()
            .build_request(&spec("SELECT 1"))
            .unwrap();
        assert_eq!(request.url.path(), "/http/");
    }
}
