//! Subcommand implementations.

use anyhow::{Context, Result};
use colored::Colorize;
use querybench_adapters::{
    probe_index_stats, BenchTarget, ClickHouseBackend, LokiBackend, QueryTarget, TargetKind,
};
use querybench_benchmarks::{io, HttpTransport, OutputFormat, RunResult};
use querybench_core::{Headers, TimeRange};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::BenchConfig;

/// Flags of the `run` subcommand.
#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Targets to run (default: all). Repeatable.
    #[arg(short, long = "target", value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Fixed iteration count instead of time-based calibration.
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// Calibration target per run, in milliseconds.
    #[arg(long)]
    pub bench_time_ms: Option<u64>,

    /// Per-request timeout, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Extra header sent to every target, as 'Name: value'. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Count failed iterations instead of aborting the run.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Skip the Loki index stats probe.
    #[arg(long)]
    pub no_probe: bool,

    /// Output directory override.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: json, markdown, both or none.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Show a progress bar for fixed-count runs.
    #[arg(long)]
    pub progress: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Fold command-line overrides into `config`.
    pub fn apply(&self, config: &mut BenchConfig) -> Result<()> {
        if let Some(ms) = self.bench_time_ms {
            config.run.bench_time_ms = ms;
            config.run.iterations = None;
        }
        if let Some(n) = self.iterations {
            config.run.iterations = Some(n);
        }
        if let Some(secs) = self.timeout_secs {
            config.run.timeout_secs = secs;
        }
        if self.continue_on_error {
            config.run.continue_on_error = true;
        }
        if self.no_probe {
            config.run.probe = false;
        }
        if let Some(dir) = &self.output {
            config.output.dir = dir.clone();
        }
        if let Some(format) = &self.format {
            config.output.format = format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Parse the `-H` values.
    pub fn extra_headers(&self) -> Result<Headers> {
        let mut headers = Headers::new();
        for raw in &self.headers {
            let (name, value) = Headers::parse_pair(raw)?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Resolve `--target` values, defaulting to every target.
pub fn resolve_targets(names: &[String]) -> Result<Vec<TargetKind>> {
    if names.is_empty() {
        return Ok(TargetKind::ALL.to_vec());
    }

    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind: TargetKind = name.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

/// Bind `kind` to its configured backend, query and headers.
pub fn build_target(
    config: &BenchConfig,
    kind: TargetKind,
    range: TimeRange,
    extra_headers: &Headers,
) -> Result<Box<dyn BenchTarget>> {
    let target: Box<dyn BenchTarget> = match kind {
        TargetKind::LokiQueryRange | TargetKind::LokiIndexStats => {
            let backend = if kind == TargetKind::LokiQueryRange {
                LokiBackend::query_range(&config.loki.base_url)?
            } else {
                LokiBackend::index_stats(&config.loki.base_url)?
            };
            let mut headers = config.loki_headers();
            headers.extend(extra_headers);
            Box::new(QueryTarget::new(kind.id(), backend, config.loki_spec(range)?, headers))
        }
        TargetKind::ClickHouse => {
            let mut backend = ClickHouseBackend::new(&config.clickhouse.base_url)?;
            for (name, value) in &config.clickhouse.settings {
                backend = backend.with_setting(name.clone(), value.clone());
            }
            let mut headers = config.clickhouse_headers();
            headers.extend(extra_headers);
            Box::new(QueryTarget::new(
                kind.id(),
                backend,
                config.clickhouse_spec(range)?,
                headers,
            ))
        }
    };
    Ok(target)
}

/// `run`: benchmark each selected target in turn and write the results.
pub async fn run(args: RunArgs, mut config: BenchConfig) -> Result<()> {
    args.apply(&mut config)?;
    let kinds = resolve_targets(&args.targets)?;
    let extra_headers = args.extra_headers()?;
    let range = config.time_range()?;
    let plan = config.run_plan();
    plan.validate()?;
    let transport = config.transport_config();

    if config.run.probe && kinds.iter().any(TargetKind::is_loki) {
        probe(&config, range, &extra_headers).await;
    }

    let mut results = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let target = build_target(&config, kind, range, &extra_headers)?;
        let result = querybench_adapters::run_target(target.as_ref(), &plan, &transport, args.progress)
            .await
            .with_context(|| format!("benchmark {} failed", kind.id()))?;

        print_run(&result, args.verbose);
        results.push(result.into_benchmark_result());
    }

    let written = io::write_all_outputs(&config.output.dir, &results, config.output.format)
        .with_context(|| format!("failed to write results to {}", config.output.dir.display()))?;

    println!("Completed {} benchmarks", results.len());
    if !written.is_empty() {
        println!("Results written to {}", config.output.dir.display());
        if args.verbose {
            for path in &written {
                println!("  - {}", path.display());
            }
        }
    }
    Ok(())
}

async fn probe(config: &BenchConfig, range: TimeRange, extra_headers: &Headers) {
    let outcome = async {
        let mut headers = config.loki_headers();
        headers.extend(extra_headers);
        let transport = HttpTransport::new(&config.transport_config(), &headers)?;
        let spec = config.loki_spec(range)?;
        probe_index_stats(&transport, &config.loki.base_url, &spec).await
    }
    .await;

    match outcome {
        Ok(stats) => info!(
            streams = stats.streams,
            chunks = stats.chunks,
            entries = stats.entries,
            bytes = stats.bytes,
            "Loki index stats"
        ),
        Err(e) => warn!(error = %e, "Index stats probe failed, continuing"),
    }
}

fn print_run(result: &RunResult, verbose: bool) {
    let ms = |d: Duration| format!("{:.3}ms", d.as_secs_f64() * 1000.0);
    let pct = |p: f64| result.distribution.percentile(p).map(ms).unwrap_or_else(|| "-".into());

    let status = if result.failures == 0 {
        "ok".green()
    } else {
        format!("{} failed", result.failures).yellow()
    };
    println!(
        "{} {}  {} iterations  mean {}  p50 {}  p95 {}  p99 {}  max {}",
        status,
        result.target_id.bold(),
        result.iterations,
        ms(result.mean()),
        pct(50.0),
        pct(95.0),
        pct(99.0),
        ms(result.distribution.max),
    );

    if verbose {
        println!("    {}", result.to_metrics());
    }
}

/// `urls`: print the request each target would send.
pub fn urls(names: &[String], config: &BenchConfig) -> Result<()> {
    let range = config.time_range()?;
    for kind in resolve_targets(names)? {
        let target = build_target(config, kind, range, &Headers::new())?;
        let request = target.build_request()?;
        println!("{:<18} {}", kind.id().bold(), request.url);
    }
    Ok(())
}

/// `status`: print version and effective configuration.
pub fn status(detailed: bool, config: &BenchConfig, config_path: Option<&std::path::Path>) -> Result<()> {
    println!("{}", "querybench".bold());
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    match config_path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: none (defaults and environment)"),
    }

    println!("\nTargets:");
    for kind in TargetKind::ALL {
        println!("  - {:<18} ({})", kind.id(), kind.cli_name());
    }

    if detailed {
        let dir = &config.output.dir;
        println!("\nOutput files:");
        println!("  - {}", dir.join(io::RAW_DIR).display());
        println!("  - {}", dir.join(io::ALL_RESULTS_FILE).display());
        println!("  - {}", dir.join(io::SUMMARY_FILE).display());
        println!("  - {}", dir.join(io::REPORT_FILE).display());

        println!("\nEffective configuration:\n");
        let rendered = toml::to_string_pretty(config).context("failed to render configuration")?;
        println!("{}", rendered);
    }
    Ok(())
}
