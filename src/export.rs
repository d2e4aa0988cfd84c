//! Writes run results to a text or JSON file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::errors::LoadTestError;
use crate::load_test::LoadTestOutcome;

/// Prefix of generated result file names.
pub const DEFAULT_FILE_PREFIX: &str = "api_pulse_results";

const WIDTH: usize = 60;

/// File format of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// `api_pulse_results_<YYYY-MM-DD_HH-MM-SS>.<ext>` for the given local time.
pub fn default_file_name(format: ExportFormat, now: DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        DEFAULT_FILE_PREFIX,
        now.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Picks the output file.
///
/// No path or a blank path gives the default name in the working directory,
/// an existing directory gets the default name inside it, and anything else
/// is used verbatim.
pub fn resolve_export_path(custom_path: Option<&Path>, default_name: &str) -> PathBuf {
    match custom_path {
        None => PathBuf::from(default_name),
        Some(path) if path.as_os_str().is_empty() => PathBuf::from(default_name),
        Some(path) if path.is_dir() => path.join(default_name),
        Some(path) => path.to_path_buf(),
    }
}

/// Plain-text report of the statistics summary.
pub fn render_text(outcome: &LoadTestOutcome) -> String {
    let stats = &outcome.report.statistics;
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);

    let mut out = String::new();
    out.push_str(&format!("{}\n", heavy));
    out.push_str("        API PULSE - LOAD TEST RESULTS\n");
    out.push_str(&format!("{}\n\n", heavy));

    out.push_str(&format!(
        "Test date:       {} UTC\n",
        stats.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Target URL:      {}\n", stats.target_url));
    out.push_str(&format!("Threads:         {}\n", stats.thread_count));
    out.push_str(&format!("Duration:        {} s\n", stats.duration_secs));
    if outcome.is_cancelled() {
        out.push_str(&format!(
            "Status:          cancelled after {:.2} s (partial results)\n",
            stats.elapsed_secs()
        ));
    }
    out.push('\n');

    out.push_str(&format!("{}\nRESPONSE TIME\n{}\n", light, light));
    out.push_str(&format!("Minimum:         {} ms\n", stats.min_latency_ms));
    out.push_str(&format!("Maximum:         {} ms\n", stats.max_latency_ms));
    out.push_str(&format!("Mean:            {:.2} ms\n", stats.mean_latency_ms));
    out.push_str(&format!("Median:          {:.2} ms\n", stats.median_latency_ms));
    out.push_str(&format!("95th percentile: {:.2} ms\n\n", stats.p95_latency_ms));

    out.push_str(&format!("{}\nREQUEST STATISTICS\n{}\n", light, light));
    out.push_str(&format!("Total requests:  {}\n", stats.total_requests));
    out.push_str(&format!("Successful:      {}\n", stats.successful_requests));
    out.push_str(&format!("Failed:          {}\n", stats.failed_requests));
    out.push_str(&format!("Success rate:    {:.2}%\n", stats.success_rate));
    out.push_str(&format!(
        "Throughput:      {:.2} req/s\n\n",
        stats.requests_per_second
    ));
    out.push_str(&format!("{}\n", heavy));
    out
}

/// JSON document with the run status, statistics and chart data.
pub fn render_json(outcome: &LoadTestOutcome) -> Result<String, LoadTestError> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

/// Writes `outcome` and returns the path that was written.
pub async fn export_results(
    outcome: &LoadTestOutcome,
    custom_path: Option<&Path>,
    format: ExportFormat,
) -> Result<PathBuf, LoadTestError> {
    let default_name = default_file_name(format, Local::now());
    let path = resolve_export_path(custom_path, &default_name);

    let contents = match format {
        ExportFormat::Text => render_text(outcome),
        ExportFormat::Json => render_json(outcome)?,
    };

    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| LoadTestError::Io {
            path: path.clone(),
            source,
        })?;

    info!(path = %path.display(), format = ?format, "Results exported");
    Ok(path)
}
