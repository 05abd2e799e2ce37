// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Untimed Loki index statistics probe.
//!
//! Run once before the Loki benchmarks to report how much data the query
//! selects. Callers treat failures as warnings.

use querybench_benchmarks::QueryTransport;
use querybench_core::{BenchError, QuerySpec, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backends::{LokiBackend, QueryBackend};

/// Response of `/loki/api/v1/index/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of streams matched
    #[serde(default)]
    pub streams: u64,
    /// Number of chunks matched
    #[serde(default)]
    pub chunks: u64,
    /// Number of log entries matched
    #[serde(default)]
    pub entries: u64,
    /// Uncompressed bytes matched
    #[serde(default)]
    pub bytes: u64,
}

/// Fetch index statistics for `spec` from the Loki instance at `base_url`.
pub async fn probe_index_stats<T>(transport: &T, base_url: &str, spec: &QuerySpec) -> Result<IndexStats>
where
    T: QueryTransport + ?Sized,
{
    let backend = LokiBackend::index_stats(base_url)?;
    let request = backend.build_request(spec)?;
    debug!(backend = backend.name(), url = %request.url, "Probing index stats");

    let response = transport.execute(&request).await?;
    if response.status != 200 {
        return Err(BenchError::unexpected_status(response.status, &response.body));
    }

    serde_json::from_slice(&response.body)
        .map_err(|e| BenchError::InvalidResponse(format!("index stats: {}", e)))
}
