//! Timed execution loop.
//!
//! Requests are issued strictly one after another: a run measures serial
//! request latency, never throughput under load. The only state crossing
//! iterations is the [`Samples`] buffer, appended to by the loop.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use querybench_core::{BenchError, PreparedRequest, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn, Instrument};
use uuid::Uuid;

use crate::result::RunResult;
use crate::stats::{validate_percentiles, LatencyDistribution, Samples};
use crate::transport::{QueryResponse, QueryTransport};

/// Percentiles reported when none are configured.
pub const DEFAULT_PERCENTILES: &[f64] = &[50.0, 90.0, 95.0, 99.0];

/// Growth cap between two calibration rounds.
const MAX_CALIBRATION_GROWTH: u64 = 100;

/// Upper bound on samples reserved up front; larger runs grow the buffer.
const MAX_PREALLOCATED_SAMPLES: u64 = 64 * 1024;

/// What happens when an iteration fails with a transport error or a non-200
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the run on the first failure
    #[default]
    Abort,
    /// Count the failure, record no sample and keep going
    Continue,
}

/// How many iterations a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    /// Exactly this many iterations
    Fixed(u64),
    /// Grow the iteration count until one pass takes at least `bench_time`
    Calibrated {
        /// Target wall time of the measured pass
        bench_time: Duration,
        /// Upper bound on iterations per pass
        max_iterations: u64,
    },
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Iteration count or calibration target
    pub iterations: Iterations,
    /// Failure handling
    pub policy: FailurePolicy,
    /// Percentiles to report
    pub percentiles: Vec<f64>,
}

impl RunPlan {
    /// Plan with a fixed number of iterations.
    pub fn fixed(iterations: u64) -> Self {
        Self {
            iterations: Iterations::Fixed(iterations),
            policy: FailurePolicy::default(),
            percentiles: DEFAULT_PERCENTILES.to_vec(),
        }
    }

    /// Plan that calibrates its iteration count to `bench_time`.
    pub fn calibrated(bench_time: Duration, max_iterations: u64) -> Self {
        Self {
            iterations: Iterations::Calibrated {
                bench_time,
                max_iterations,
            },
            policy: FailurePolicy::default(),
            percentiles: DEFAULT_PERCENTILES.to_vec(),
        }
    }

    /// Set the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the reported percentiles.
    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    /// Reject plans that cannot produce a measurement.
    pub fn validate(&self) -> Result<()> {
        match self.iterations {
            Iterations::Fixed(0) => {
                return Err(BenchError::Configuration(
                    "iterations must be at least 1".to_string(),
                ))
            }
            Iterations::Calibrated {
                bench_time,
                max_iterations,
            } => {
                if bench_time.is_zero() {
                    return Err(BenchError::Configuration(
                        "bench time must be greater than zero".to_string(),
                    ));
                }
                if max_iterations == 0 {
                    return Err(BenchError::Configuration(
                        "max iterations must be at least 1".to_string(),
                    ));
                }
            }
            Iterations::Fixed(_) => {}
        }
        validate_percentiles(&self.percentiles)
    }
}

/// Counters of one pass through the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Iterations started
    pub attempted: u64,
    /// Iterations that failed under [`FailurePolicy::Continue`]
    pub failures: u64,
    /// Body bytes drained by successful iterations
    pub bytes_received: u64,
    /// Wall time of the whole pass
    pub wall_time: Duration,
}

/// Run `iterations` timed requests, appending one sample per success.
///
/// `build` is called once per iteration to produce a fresh request; its
/// errors are always fatal, as is anything other than a transport failure or
/// a non-200 status. Under [`FailurePolicy::Abort`] the first failed
/// request ends the pass: no sample is recorded for it and nothing else is
/// sent.
pub async fn run_timed<T, F>(
    transport: &T,
    iterations: u64,
    policy: FailurePolicy,
    samples: &mut Samples,
    progress: Option<&ProgressBar>,
    mut build: F,
) -> Result<LoopOutcome>
where
    T: QueryTransport + ?Sized,
    F: FnMut() -> Result<PreparedRequest>,
{
    let mut outcome = LoopOutcome::default();
    let pass_start = Instant::now();

    for iteration in 0..iterations {
        let request = build()?;
        outcome.attempted += 1;

        let started = Instant::now();
        let result = transport.execute(&request).await;
        let elapsed = started.elapsed();

        match result.and_then(check_status) {
            Ok(bytes) => {
                samples.push(elapsed);
                outcome.bytes_received += bytes;
                trace!(
                    iteration,
                    endpoint = request.endpoint,
                    elapsed_us = elapsed.as_micros() as u64,
                    bytes,
                    "Iteration completed"
                );
            }
            Err(err) if policy == FailurePolicy::Continue && err.is_backend_failure() => {
                outcome.failures += 1;
                warn!(
                    iteration,
                    endpoint = request.endpoint,
                    error = %err,
                    "Iteration failed"
                );
            }
            Err(err) => {
                error!(
                    iteration,
                    endpoint = request.endpoint,
                    error = %err,
                    "Aborting run"
                );
                return Err(err);
            }
        }

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    outcome.wall_time = pass_start.elapsed();
    Ok(outcome)
}

fn preallocation(iterations: u64) -> usize {
    iterations.min(MAX_PREALLOCATED_SAMPLES) as usize
}

/// Accept only 200 OK; returns the drained body size.
fn check_status(response: QueryResponse) -> Result<u64> {
    if response.status != 200 {
        return Err(BenchError::unexpected_status(
            response.status,
            &response.body,
        ));
    }
    Ok(response.body.len() as u64)
}

/// Iteration count for the next calibration round.
///
/// Aims at `bench_time` given that `prev` iterations took `elapsed`, adds 20%
/// headroom, and never grows more than 100x, shrinks, or exceeds `max`.
pub fn predict_iterations(bench_time: Duration, prev: u64, elapsed: Duration, max: u64) -> u64 {
    let prev = prev.max(1) as u128;
    let elapsed_ns = elapsed.as_nanos().max(1);

    let mut n = bench_time.as_nanos().saturating_mul(prev) / elapsed_ns;
    n += n / 5;
    n = n.min(prev * MAX_CALIBRATION_GROWTH as u128);
    n = n.max(prev + 1);
    n.min(max as u128) as u64
}

/// Owns the transport for the lifetime of a run and drives the loop.
pub struct Runner<T> {
    transport: T,
    plan: RunPlan,
    show_progress: bool,
}

impl<T: QueryTransport> Runner<T> {
    /// Create a runner, validating the plan.
    pub fn new(transport: T, plan: RunPlan) -> Result<Self> {
        plan.validate()?;
        Ok(Self {
            transport,
            plan,
            show_progress: false,
        })
    }

    /// Draw a progress bar for fixed-iteration runs.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Transport shared by every iteration.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Plan this runner executes.
    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Execute one run for `target_id`, building each request with `build`.
    pub async fn run<F>(&self, target_id: &str, build: F) -> Result<RunResult>
    where
        F: FnMut() -> Result<PreparedRequest>,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, target = target_id);
        self.run_inner(run_id, target_id, build)
            .instrument(span)
            .await
    }

    async fn run_inner<F>(&self, run_id: Uuid, target_id: &str, mut build: F) -> Result<RunResult>
    where
        F: FnMut() -> Result<PreparedRequest>,
    {
        let policy = self.plan.policy;

        let (started_at, samples, outcome) = match self.plan.iterations {
            Iterations::Fixed(n) => {
                info!(iterations = n, ?policy, "Starting run");
                let progress = self.progress_bar(n);
                let mut samples = Samples::with_capacity(preallocation(n));
                let started_at = Utc::now();
                let outcome = run_timed(
                    &self.transport,
                    n,
                    policy,
                    &mut samples,
                    progress.as_ref(),
                    &mut build,
                )
                .await;
                if let Some(pb) = &progress {
                    pb.finish_and_clear();
                }
                (started_at, samples, outcome?)
            }
            Iterations::Calibrated {
                bench_time,
                max_iterations,
            } => {
                info!(
                    bench_time_ms = bench_time.as_millis() as u64,
                    max_iterations,
                    ?policy,
                    "Starting calibrated run"
                );
                let mut n = 1;
                loop {
                    let mut samples = Samples::with_capacity(preallocation(n));
                    let started_at = Utc::now();
                    let outcome =
                        run_timed(&self.transport, n, policy, &mut samples, None, &mut build)
                            .await?;

                    if outcome.wall_time >= bench_time || n >= max_iterations {
                        break (started_at, samples, outcome);
                    }

                    let next = predict_iterations(bench_time, n, outcome.wall_time, max_iterations);
                    debug!(
                        iterations = n,
                        wall_time_ms = outcome.wall_time.as_millis() as u64,
                        next,
                        "Calibrating"
                    );
                    n = next;
                }
            }
        };

        let distribution = LatencyDistribution::from_samples(samples.as_slice(), &self.plan.percentiles)?;

        info!(
            iterations = outcome.attempted,
            failures = outcome.failures,
            mean_us = distribution.mean.as_micros() as u64,
            max_us = distribution.max.as_micros() as u64,
            "Run completed"
        );

        Ok(RunResult {
            run_id,
            target_id: target_id.to_string(),
            started_at,
            iterations: outcome.attempted,
            failures: outcome.failures,
            total: samples.total(),
            wall_time: outcome.wall_time,
            distribution,
            bytes_received: outcome.bytes_received,
        })
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockQueryTransport;
    use url::Url;

    fn request() -> Result<PreparedRequest> {
        Ok(PreparedRequest::new(
            Url::parse("http://localhost:3100/loki/api/v1/query_range?query=x").unwrap(),
            "query_range",
        ))
    }

    fn ok_response() -> Result<QueryResponse> {
        Ok(QueryResponse::new(200, &b"{\"status\":\"success\"}"[..]))
    }

    #[tokio::test]
    async fn test_fixed_run_records_every_sample() {
        let mut transport = MockQueryTransport::new();
        transport
            .expect_execute()
            .times(5)
            .returning(|_| ok_response());

        let runner = Runner::new(transport, RunPlan::fixed(5)).unwrap();
        let result = runner.run("loki/query_range", request).await.unwrap();

        assert_eq!(result.iterations, 5);
        assert_eq!(result.samples(), 5);
        assert_eq!(result.failures, 0);
        assert_eq!(result.bytes_received, 5 * 20);
        assert_eq!(result.target_id, "loki/query_range");
    }

    #[tokio::test]
    async fn test_non_200_aborts_immediately() {
        let mut transport = MockQueryTransport::new();
        let mut calls = 0;
        transport.expect_execute().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                ok_response()
            } else {
                Ok(QueryResponse::new(500, &b"internal error"[..]))
            }
        });

        let mut samples = Samples::new();
        let err = run_timed(&transport, 10, FailurePolicy::Abort, &mut samples, None, request)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BenchError::UnexpectedStatus { status: 500, .. }
        ));
        assert_eq!(samples.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let mut transport = MockQueryTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Err(BenchError::Transport {
                message: "operation timed out".to_string(),
                timed_out: true,
            })
        });

        let runner = Runner::new(transport, RunPlan::fixed(4)).unwrap();
        let err = runner.run("clickhouse/query", request).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_builder_error_is_fatal_even_when_continuing() {
        let mut transport = MockQueryTransport::new();
        transport.expect_execute().times(0);

        let mut samples = Samples::new();
        let err = run_timed(
            &transport,
            3,
            FailurePolicy::Continue,
            &mut samples,
            None,
            || Err(BenchError::Configuration("query must not be empty".to_string())),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BenchError::Configuration(_)));
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_huge_fixed_count_does_not_reserve_every_sample() {
        let mut transport = MockQueryTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Ok(QueryResponse::new(503, &b"unavailable"[..])));

        let runner = Runner::new(transport, RunPlan::fixed(u64::MAX)).unwrap();
        let err = runner.run("loki/query_range", request).await.unwrap_err();

        assert!(matches!(err, BenchError::UnexpectedStatus { status: 503, .. }));
        assert_eq!(preallocation(u64::MAX), 64 * 1024);
        assert_eq!(preallocation(10), 10);
    }

    #[tokio::test]
    async fn test_continue_policy_still_aborts_on_bad_response() {
        let mut transport = MockQueryTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Err(BenchError::InvalidResponse("truncated body".to_string())));

        let plan = RunPlan::fixed(5).with_policy(FailurePolicy::Continue);
        let runner = Runner::new(transport, plan).unwrap();
        let err = runner.run("loki/query_range", request).await.unwrap_err();
        assert!(matches!(err, BenchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_continue_policy_counts_failures() {
        let mut transport = MockQueryTransport::new();
        let mut calls = 0;
        transport.expect_execute().times(6).returning(move |_| {
            calls += 1;
            if calls % 2 == 0 {
                Ok(QueryResponse::new(429, &b"slow down"[..]))
            } else {
                ok_response()
            }
        });

        let plan = RunPlan::fixed(6).with_policy(FailurePolicy::Continue);
        let runner = Runner::new(transport, plan).unwrap();
        let result = runner.run("loki/index_stats", request).await.unwrap();

        assert_eq!(result.iterations, 6);
        assert_eq!(result.failures, 3);
        assert_eq!(result.samples(), 3);
    }

    #[tokio::test]
    async fn test_calibration_stops_at_max_iterations() {
        let mut transport = MockQueryTransport::new();
        transport.expect_execute().returning(|_| ok_response());

        let plan = RunPlan::calibrated(Duration::from_secs(60), 50);
        let runner = Runner::new(transport, plan).unwrap();
        let result = runner.run("loki/query_range", request).await.unwrap();

        assert_eq!(result.iterations, 50);
        assert_eq!(result.samples(), 50);
    }

    #[tokio::test]
    async fn test_calibration_reaches_bench_time() {
        let mut transport = MockQueryTransport::new();
        transport.expect_execute().returning(|_| {
            std::thread::sleep(Duration::from_millis(1));
            ok_response()
        });

        let bench_time = Duration::from_millis(10);
        let runner = Runner::new(transport, RunPlan::calibrated(bench_time, 10_000)).unwrap();
        let result = runner.run("loki/query_range", request).await.unwrap();

        assert!(result.wall_time >= bench_time);
        assert!(result.iterations > 1);
        assert_eq!(result.samples() as u64, result.iterations);
    }

    #[test]
    fn test_predict_iterations() {
        let second = Duration::from_secs(1);
        // 1 iteration in 10ms, aiming at 1s: 100 + 20%, capped at 100x growth
        assert_eq!(predict_iterations(second, 1, Duration::from_millis(10), 1_000_000), 100);
        // 100 iterations in 500ms: 200 + 20%
        assert_eq!(predict_iterations(second, 100, Duration::from_millis(500), 1_000_000), 240);
        // never shrinks
        assert_eq!(predict_iterations(second, 100, Duration::from_secs(5), 1_000_000), 101);
        // capped
        assert_eq!(predict_iterations(second, 100, Duration::from_millis(500), 150), 150);
    }

    #[test]
    fn test_plan_validation() {
        assert!(RunPlan::fixed(0).validate().is_err());
        assert!(RunPlan::fixed(1).validate().is_ok());
        assert!(RunPlan::calibrated(Duration::ZERO, 10).validate().is_err());
        assert!(RunPlan::calibrated(Duration::from_secs(1), 0).validate().is_err());
        assert!(RunPlan::fixed(1)
            .with_percentiles(vec![50.0, 150.0])
            .validate()
            .is_err());
    }
}
