// Copyright 2025 querybench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark target adapters.
//!
//! This crate knows how each backend under test wants to be queried:
//!
//! - **Loki**: `query_range` and `index/stats` with nanosecond timestamps
//! - **ClickHouse**: raw SQL over the HTTP interface with per-query settings
//!
//! It also provides the canonical [`BenchTarget`] trait binding a backend to
//! a query, and the untimed Loki index statistics probe.
//!
//! # Example
//!
//! ```no_run
//! use querybench_adapters::prelude::*;
//! use querybench_benchmarks::{RunPlan, TransportConfig};
//! use querybench_core::{Headers, QuerySpec, TimeRange};
//! use std::time::Duration;
//!
//! # async fn example() -> querybench_core::Result<()> {
//! let spec = QuerySpec::new(r#"{service_name="api"}"#, TimeRange::last(Duration::from_secs(3600))?)?
//!     .with_limit(5000);
//! let target = QueryTarget::new(
//!     TargetKind::LokiQueryRange.id(),
//!     LokiBackend::query_range("http://localhost:3100")?,
//!     spec,
//!     Headers::tenant("tenant1"),
//! );
//! let result = run_target(&target, &RunPlan::fixed(100), &TransportConfig::default(), false).await?;
//! println!("p50: {:?}", result.distribution.percentile(50.0));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod backends;
pub mod probe;
pub mod targets;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::backends::{ClickHouseBackend, LokiBackend, LokiEndpoint, QueryBackend};
    pub use super::probe::{probe_index_stats, IndexStats};
    pub use super::targets::{run_target, run_target_with, BenchTarget, QueryTarget, TargetKind};
}

pub use backends::{ClickHouseBackend, LokiBackend, QueryBackend};
pub use probe::{probe_index_stats, IndexStats};
pub use targets::{run_target, run_target_with, BenchTarget, QueryTarget, TargetKind};
