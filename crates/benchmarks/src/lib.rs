//! Timed request loop and reporting for querybench.
//!
//! A [`Runner`] owns one pooled [`HttpTransport`] for the lifetime of a run
//! and issues the same query over and over, strictly serially, timing each
//! request from send until its body is fully drained.
//!
//! # Quick Start
//!
//! ```no_run
//! use querybench_benchmarks::{HttpTransport, RunPlan, Runner, TransportConfig};
//! use querybench_core::{Headers, PreparedRequest};
//!
//! # async fn example() -> querybench_core::Result<()> {
//! let transport = HttpTransport::new(&TransportConfig::default(), &Headers::tenant("tenant1"))?;
//! let runner = Runner::new(transport, RunPlan::fixed(100))?;
//!
//! let url = url::Url::parse("http://localhost:8123/?query=SELECT%201").unwrap();
//! let result = runner
//!     .run("clickhouse/query", || Ok(PreparedRequest::new(url.clone(), "query")))
//!     .await?;
//! println!("mean: {:?}", result.mean());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`transport`] - the transport seam and its `reqwest` implementation
//! - [`runner`] - the timed loop, failure policy and calibration
//! - [`stats`] - latency distribution and percentiles
//! - [`result`] - `RunResult` and the canonical `BenchmarkResult`
//! - [`io`] - reading/writing results
//! - [`markdown`] - Markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod io;
pub mod markdown;
pub mod result;
pub mod runner;
pub mod stats;
pub mod transport;

pub use io::OutputFormat;
pub use result::{BenchmarkResult, RunResult};
pub use runner::{run_timed, FailurePolicy, Iterations, RunPlan, Runner, DEFAULT_PERCENTILES};
pub use stats::{LatencyDistribution, Percentile, Samples};
pub use transport::{HttpTransport, QueryResponse, QueryTransport, TransportConfig};
