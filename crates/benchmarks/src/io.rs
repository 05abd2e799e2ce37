//! I/O operations for benchmark results.
//!
//! This module provides functionality to read and write benchmark
//! results to an output directory as JSON and markdown.

use crate::markdown;
use crate::result::BenchmarkResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default output directory path.
pub const OUTPUT_DIR: &str = "benchmarks/output";

/// Raw results subdirectory.
pub const RAW_DIR: &str = "raw";

/// Summary file name.
pub const SUMMARY_FILE: &str = "summary.md";

/// Detailed report file name.
pub const REPORT_FILE: &str = "report.md";

/// Combined results file name.
pub const ALL_RESULTS_FILE: &str = "all_results.json";

/// Which outputs to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw and combined JSON only
    Json,
    /// Markdown summary and report only
    Markdown,
    /// JSON and markdown
    #[default]
    Both,
    /// Nothing is written
    None,
}

impl OutputFormat {
    fn json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }

    fn markdown(self) -> bool {
        matches!(self, OutputFormat::Markdown | OutputFormat::Both)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "both" => Ok(OutputFormat::Both),
            "none" => Ok(OutputFormat::None),
            other => Err(format!(
                "unknown output format '{}', expected json, markdown, both or none",
                other
            )),
        }
    }
}

/// Ensure output directories exist.
pub fn ensure_output_dirs(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir.join(RAW_DIR))
}

/// Write benchmark results to JSON file.
pub fn write_results_json(results: &[BenchmarkResult], path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Write individual result to the raw directory, returning its path.
pub fn write_raw_result(dir: &Path, result: &BenchmarkResult) -> io::Result<PathBuf> {
    ensure_output_dirs(dir)?;
    let path = dir
        .join(RAW_DIR)
        .join(format!("{}.json", result.target_id.replace('/', "_")));
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Write summary markdown file.
pub fn write_summary(dir: &Path, results: &[BenchmarkResult]) -> io::Result<PathBuf> {
    ensure_output_dirs(dir)?;
    let path = dir.join(SUMMARY_FILE);
    fs::write(&path, markdown::generate_summary(results))?;
    Ok(path)
}

/// Write detailed markdown report.
pub fn write_report(dir: &Path, results: &[BenchmarkResult]) -> io::Result<PathBuf> {
    ensure_output_dirs(dir)?;
    let path = dir.join(REPORT_FILE);
    fs::write(&path, markdown::generate_detailed_report(results))?;
    Ok(path)
}

/// Write every output selected by `format`, returning the files written.
pub fn write_all_outputs(
    dir: &Path,
    results: &[BenchmarkResult],
    format: OutputFormat,
) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if format == OutputFormat::None {
        return Ok(written);
    }
    ensure_output_dirs(dir)?;

    if format.json() {
        for result in results {
            written.push(write_raw_result(dir, result)?);
        }
        let combined = dir.join(ALL_RESULTS_FILE);
        write_results_json(results, &combined)?;
        written.push(combined);
    }

    if format.markdown() {
        written.push(write_summary(dir, results)?);
        written.push(write_report(dir, results)?);
    }

    Ok(written)
}

/// Read results from JSON file.
pub fn read_results_json(path: impl AsRef<Path>) -> io::Result<Vec<BenchmarkResult>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results() -> Vec<BenchmarkResult> {
        vec![
            BenchmarkResult::new("loki/query_range", json!({"iterations": 10, "mean_ms": 12.5})),
            BenchmarkResult::new("clickhouse/query", json!({"iterations": 10, "mean_ms": 4.0})),
        ]
    }

    #[test]
    fn test_write_all_outputs_both() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_all_outputs(dir.path(), &results(), OutputFormat::Both).unwrap();

        assert_eq!(written.len(), 5);
        assert!(dir.path().join("raw/loki_query_range.json").exists());
        assert!(dir.path().join("raw/clickhouse_query.json").exists());
        assert!(dir.path().join(SUMMARY_FILE).exists());
        assert!(dir.path().join(REPORT_FILE).exists());

        let read = read_results_json(dir.path().join(ALL_RESULTS_FILE)).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].target_id, "loki/query_range");
        assert_eq!(read[1].metric_f64("mean_ms"), Some(4.0));
    }

    #[test]
    fn test_write_json_only() {
        let dir = tempfile::tempdir().unwrap();
        write_all_outputs(dir.path(), &results(), OutputFormat::Json).unwrap();
        assert!(dir.path().join(ALL_RESULTS_FILE).exists());
        assert!(!dir.path().join(SUMMARY_FILE).exists());
    }

    #[test]
    fn test_write_none() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("untouched");
        let written = write_all_outputs(&out, &results(), OutputFormat::None).unwrap();
        assert!(written.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("both".parse::<OutputFormat>().unwrap(), OutputFormat::Both);
        assert_eq!("none".parse::<OutputFormat>().unwrap(), OutputFormat::None);
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
