//! CLI for querybench.
//!
//! Benchmarks Loki and ClickHouse query latency against a running stack and
//! writes the results to canonical output directories.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commands;
pub mod config;
pub mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::RunArgs;
use crate::config::BenchConfig;
use crate::logging::LogConfig;

/// querybench CLI.
#[derive(Parser, Debug)]
#[command(name = "querybench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true, env = "QUERYBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Default log level (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log format: text or json.
    #[arg(long, global = true, default_value = "text")]
    pub log_format: String,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark the selected targets and write results.
    ///
    /// Results are written to:
    /// - benchmarks/output/raw/ - Individual JSON files per target
    /// - benchmarks/output/all_results.json - Combined JSON file
    /// - benchmarks/output/summary.md - Markdown summary
    /// - benchmarks/output/report.md - Detailed report
    Run(RunArgs),

    /// Print the request URL each target would send.
    Urls {
        /// Targets to print (default: all).
        #[arg(short, long = "target", value_name = "TARGET")]
        targets: Vec<String>,
    },

    /// Show version, targets and effective configuration.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Run the CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    logging::init_tracing(&LogConfig::parse(&cli.log_level, &cli.log_format)?)?;
    let config = BenchConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;

    match cli.command {
        Commands::Run(args) => {
            // Iterations run strictly serially.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            runtime.block_on(commands::run(args, config))
        }
        Commands::Urls { targets } => commands::urls(&targets, &config),
        Commands::Status { detailed } => commands::status(detailed, &config, cli.config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "querybench",
            "--log-format",
            "json",
            "run",
            "-t",
            "clickhouse",
            "--target",
            "loki-query-range",
            "-n",
            "50",
            "-H",
            "Authorization: Bearer abc",
            "--continue-on-error",
            "--no-probe",
            "-f",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, "json");
        assert_eq!(cli.log_level, "info");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.targets, vec!["clickhouse", "loki-query-range"]);
                assert_eq!(args.iterations, Some(50));
                assert_eq!(args.headers, vec!["Authorization: Bearer abc"]);
                assert!(args.continue_on_error);
                assert!(args.no_probe);
                assert_eq!(args.format.as_deref(), Some("json"));
                assert!(!args.verbose);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_status_and_urls() {
        let cli = Cli::try_parse_from(["querybench", "status", "--detailed", "-c", "bench.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bench.toml")));
        assert!(matches!(cli.command, Commands::Status { detailed: true }));

        let cli = Cli::try_parse_from(["querybench", "urls"]).unwrap();
        assert!(matches!(cli.command, Commands::Urls { ref targets } if targets.is_empty()));
    }

    #[test]
    fn test_rejects_non_numeric_iterations() {
        assert!(Cli::try_parse_from(["querybench", "run", "-n", "many"]).is_err());
    }

    #[test]
    fn test_requires_subcommand() {
        assert!(Cli::try_parse_from(["querybench"]).is_err());
    }
}
