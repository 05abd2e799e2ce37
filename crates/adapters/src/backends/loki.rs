// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Loki query API.
//!
//! Timestamps are sent as nanoseconds since the Unix epoch. Only
//! `query_range` accepts a `limit`.

use querybench_core::query::ensure_query;
use querybench_core::{PreparedRequest, QuerySpec, Result};
use url::Url;

use super::{endpoint_url, parse_base_url, QueryBackend};

/// Loki endpoints that can be benchmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LokiEndpoint {
    /// `/loki/api/v1/query_range`
    QueryRange,
    /// `/loki/api/v1/index/stats`
    IndexStats,
}

impl LokiEndpoint {
    /// URL path of the endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Self::QueryRange => "/loki/api/v1/query_range",
            Self::IndexStats => "/loki/api/v1/index/stats",
        }
    }

    /// Short label used in logs and target ids.
    pub fn label(&self) -> &'static str {
        match self {
            Self::QueryRange => "query_range",
            Self::IndexStats => "index_stats",
        }
    }

    fn accepts_limit(&self) -> bool {
        matches!(self, Self::QueryRange)
    }
}

/// Request builder for one Loki endpoint.
#[derive(Debug, Clone)]
pub struct LokiBackend {
    base_url: Url,
    endpoint: LokiEndpoint,
}

impl LokiBackend {
    /// Builder for `endpoint` on the Loki instance at `base_url`.
    pub fn new(base_url: &str, endpoint: LokiEndpoint) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            endpoint,
        })
    }

    /// Builder for `/loki/api/v1/query_range`.
    pub fn query_range(base_url: &str) -> Result<Self> {
        Self::new(base_url, LokiEndpoint::QueryRange)
    }

    /// Builder for `/loki/api/v1/index/stats`.
    pub fn index_stats(base_url: &str) -> Result<Self> {
        Self::new(base_url, LokiEndpoint::IndexStats)
    }
}

impl QueryBackend for LokiBackend {
    fn name(&self) -> &str {
        "loki"
    }

    fn build_request(&self, spec: &QuerySpec) -> Result<PreparedRequest> {
        ensure_query(spec.query())?;
        let start = spec.range().start_nanos()?;
        let end = spec.range().end_nanos()?;

        let mut url = endpoint_url(&self.base_url, self.endpoint.path());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", spec.query());
            pairs.append_pair("start", &start.to_string());
            pairs.append_pair("end", &end.to_string());
            if self.endpoint.accepts_limit() {
                if let Some(limit) = spec.limit() {
                    pairs.append_pair("limit", &limit.to_string());
                }
            }
            for (name, value) in spec.params() {
                pairs.append_pair(name, value);
            }
        }

        Ok(PreparedRequest::new(url, self.endpoint.label()))
    }
}
