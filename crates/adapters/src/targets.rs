// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark targets: one backend, one query, one header set.

use querybench_benchmarks::{
    HttpTransport, QueryTransport, RunPlan, RunResult, Runner, TransportConfig,
};
use querybench_core::{BenchError, Headers, PreparedRequest, QuerySpec, Result};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::backends::QueryBackend;

/// Canonical benchmark target trait.
///
/// Implement this trait for anything that can be measured by the timed loop.
pub trait BenchTarget {
    /// Returns the unique identifier for this benchmark target.
    fn id(&self) -> String;

    /// Headers attached to every request.
    fn headers(&self) -> &Headers;

    /// Build a fresh request for one iteration.
    fn build_request(&self) -> Result<PreparedRequest>;
}

/// The targets this tool knows how to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Loki `query_range`
    LokiQueryRange,
    /// Loki `index/stats`
    LokiIndexStats,
    /// ClickHouse SQL over HTTP
    ClickHouse,
}

impl TargetKind {
    /// Every target, in the order they run by default.
    pub const ALL: [TargetKind; 3] = [
        TargetKind::LokiQueryRange,
        TargetKind::LokiIndexStats,
        TargetKind::ClickHouse,
    ];

    /// Identifier used in results and output file names.
    pub fn id(&self) -> &'static str {
        match self {
            Self::LokiQueryRange => "loki/query_range",
            Self::LokiIndexStats => "loki/index_stats",
            Self::ClickHouse => "clickhouse/query",
        }
    }

    /// Name accepted on the command line.
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::LokiQueryRange => "loki-query-range",
            Self::LokiIndexStats => "loki-index-stats",
            Self::ClickHouse => "clickhouse",
        }
    }

    /// Whether the target talks to Loki.
    pub fn is_loki(&self) -> bool {
        matches!(self, Self::LokiQueryRange | Self::LokiIndexStats)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for TargetKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        TargetKind::ALL
            .into_iter()
            .find(|kind| kind.cli_name() == s || kind.id() == s)
            .ok_or_else(|| {
                BenchError::Configuration(format!(
                    "unknown target '{}', expected one of: {}",
                    s,
                    TargetKind::ALL.map(|k| k.cli_name()).join(", ")
                ))
            })
    }
}

/// A [`QueryBackend`] bound to a fixed [`QuerySpec`] and header set.
#[derive(Debug, Clone)]
pub struct QueryTarget<B> {
    id: String,
    backend: B,
    spec: QuerySpec,
    headers: Headers,
}

impl<B: QueryBackend> QueryTarget<B> {
    /// Create a target.
    pub fn new(id: impl Into<String>, backend: B, spec: QuerySpec, headers: Headers) -> Self {
        Self {
            id: id.into(),
            backend,
            spec,
            headers,
        }
    }
}

impl<B: QueryBackend> BenchTarget for QueryTarget<B> {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn build_request(&self) -> Result<PreparedRequest> {
        self.backend.build_request(&self.spec)
    }
}

/// Run `target` on an existing runner.
pub async fn run_target_with<T>(runner: &Runner<T>, target: &dyn BenchTarget) -> Result<RunResult>
where
    T: QueryTransport,
{
    runner.run(&target.id(), || target.build_request()).await
}

/// Run `target` with a fresh pooled HTTP client that is dropped when the run
/// ends.
pub async fn run_target(
    target: &dyn BenchTarget,
    plan: &RunPlan,
    transport: &TransportConfig,
    show_progress: bool,
) -> Result<RunResult> {
    // Fail on a malformed request before opening any connection.
    let first = target.build_request()?;
    info!(target = %target.id(), url = %first.url, "Benchmarking");

    let transport = HttpTransport::new(transport, target.headers())?;
    let runner = Runner::new(transport, plan.clone())?.with_progress(show_progress);
    run_target_with(&runner, target).await
}
