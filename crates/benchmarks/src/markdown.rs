//! Markdown output generation for benchmark results.

use crate::result::BenchmarkResult;
use std::fmt::Write;

/// Metric columns of the summary table.
const SUMMARY_COLUMNS: &[(&str, &str)] = &[
    ("Mean", "mean_ms"),
    ("p50", "p50_ms"),
    ("p95", "p95_ms"),
    ("p99", "p99_ms"),
    ("Max", "max_ms"),
];

/// Generate a markdown summary from benchmark results.
pub fn generate_summary(results: &[BenchmarkResult]) -> String {
    let mut output = String::new();

    writeln!(output, "# Benchmark Summary").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "## Results").unwrap();
    writeln!(output).unwrap();

    write!(output, "| Target ID | Iterations | Failures |").unwrap();
    for (title, _) in SUMMARY_COLUMNS {
        write!(output, " {} (ms) |", title).unwrap();
    }
    writeln!(output).unwrap();
    write!(output, "|-----------|------------|----------|").unwrap();
    for _ in SUMMARY_COLUMNS {
        write!(output, "------|").unwrap();
    }
    writeln!(output).unwrap();

    for result in results {
        write!(
            output,
            "| {} | {} | {} |",
            result.target_id,
            count(result, "iterations"),
            count(result, "failures"),
        )
        .unwrap();
        for (_, key) in SUMMARY_COLUMNS {
            write!(output, " {} |", millis(result, key)).unwrap();
        }
        writeln!(output).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total benchmarks: {}", results.len()).unwrap();

    output
}

/// Generate detailed markdown report: one section per target with its run
/// counters, every latency metric it recorded and the raw metrics object.
pub fn generate_detailed_report(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();

    writeln!(out, "# Latency Report").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "{} target(s), rendered {}", results.len(), chrono::Utc::now().to_rfc3339()).unwrap();

    for result in results {
        writeln!(out).unwrap();
        writeln!(out, "## {}", result.target_id).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "- Started: {}", result.timestamp.to_rfc3339()).unwrap();
        writeln!(out, "- Iterations: {}", count(result, "iterations")).unwrap();
        writeln!(out, "- Failures: {}", count(result, "failures")).unwrap();
        writeln!(out, "- Bytes received: {}", count(result, "bytes_received")).unwrap();
        writeln!(out, "- Wall time: {} ms", millis(result, "wall_time_ms")).unwrap();
        writeln!(out).unwrap();

        let latencies: Vec<(&str, f64)> = match result.metrics.as_object() {
            Some(map) => map
                .iter()
                .filter(|(key, _)| key.ends_with("_ms") && !matches!(key.as_str(), "total_ms" | "wall_time_ms"))
                .filter_map(|(key, value)| value.as_f64().map(|v| (key.as_str(), v)))
                .collect(),
            None => Vec::new(),
        };
        if !latencies.is_empty() {
            writeln!(out, "| Statistic | Latency (ms) |").unwrap();
            writeln!(out, "|-----------|--------------|").unwrap();
            for (key, value) in latencies {
                writeln!(out, "| {} | {:.3} |", key.trim_end_matches("_ms"), value).unwrap();
            }
            writeln!(out).unwrap();
        }

        writeln!(out, "<details><summary>Raw metrics</summary>").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "```json").unwrap();
        writeln!(out, "{}", serde_json::to_string_pretty(&result.metrics).unwrap_or_default()).unwrap();
        writeln!(out, "```").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "</details>").unwrap();
    }

    out
}

fn count(result: &BenchmarkResult, key: &str) -> String {
    result
        .metrics
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn millis(result: &BenchmarkResult, key: &str) -> String {
    result
        .metric_f64(key)
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "-".to_string())
}
