// src/report.rs

use chrono::{DateTime, Utc};
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::models::{Analysis, CheckName, Finding, Severity, Status, TargetResult};

/// One row of the tabular export: a finding flattened together with its
/// target. The column names are part of the CSV contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FindingRow {
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Header_Name")]
    pub header_name: CheckName,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "Severity")]
    pub severity: Severity,
    #[serde(rename = "Remark")]
    pub remark: String,
}

/// Flattens one probe result into rows, one per finding, preserving the
/// finding order.
pub fn flatten_findings(result: &TargetResult) -> Vec<FindingRow> {
    result
        .findings
        .iter()
        .map(|finding| FindingRow {
            target: result.target.clone(),
            header_name: finding.name,
            value: finding.value.clone(),
            status: finding.status,
            severity: finding.severity,
            remark: finding.remark.clone(),
        })
        .collect()
}

/// Inverse of [`flatten_findings`] over a row stream: regroups rows into
/// per-target finding sequences, preserving both the order in which targets
/// first appear and the row order within each target.
pub fn group_rows(rows: &[FindingRow]) -> Vec<(String, Vec<Finding>)> {
    let mut grouped: Vec<(String, Vec<Finding>)> = Vec::new();
    for row in rows {
        let finding = Finding::new(
            row.header_name,
            row.value.clone(),
            row.status,
            row.severity,
            &row.remark,
        );
        match grouped.iter_mut().find(|(target, _)| *target == row.target) {
            Some((_, findings)) => findings.push(finding),
            None => grouped.push((row.target.clone(), vec![finding])),
        }
    }
    grouped
}

/// Filename timestamp component, e.g. `20250301_120000`.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Writes one target's full JSON report, returning the path written.
pub fn write_target_report(outdir: &Path, result: &TargetResult, stamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(outdir)
        .wrap_err_with(|| format!("failed to create report directory {}", outdir.display()))?;
    let path = outdir.join(format!("{}_headers_{stamp}.json", result.target));
    let json = serde_json::to_string_pretty(result)?;
    fs::write(&path, json)
        .wrap_err_with(|| format!("failed to write report {}", path.display()))?;
    debug!(path = %path.display(), "Wrote target report.");
    Ok(path)
}

/// Writes the combined batch report (`all_headers_<stamp>.json`).
pub fn write_combined_report(
    outdir: &Path,
    results: &[TargetResult],
    stamp: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(outdir)
        .wrap_err_with(|| format!("failed to create report directory {}", outdir.display()))?;
    let path = outdir.join(format!("all_headers_{stamp}.json"));
    let json = serde_json::to_string_pretty(results)?;
    fs::write(&path, json)
        .wrap_err_with(|| format!("failed to write combined report {}", path.display()))?;
    info!(path = %path.display(), "Wrote combined report.");
    Ok(path)
}

/// Writes the per-target CSV summary, one row per finding.
pub fn write_csv_summary(outdir: &Path, result: &TargetResult, stamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(outdir)
        .wrap_err_with(|| format!("failed to create summary directory {}", outdir.display()))?;
    let path = outdir.join(format!("{}_headers_summary_{stamp}.csv", result.target));
    let mut writer = csv::Writer::from_path(&path)
        .wrap_err_with(|| format!("failed to create CSV summary {}", path.display()))?;
    for row in flatten_findings(result) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), "Wrote CSV summary.");
    Ok(path)
}

/// Writes the aggregate analysis as JSON.
pub fn write_analysis(outdir: &Path, analysis: &Analysis, stamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(outdir)
        .wrap_err_with(|| format!("failed to create output directory {}", outdir.display()))?;
    let path = outdir.join(format!("analysis_{stamp}.json"));
    let json = serde_json::to_string_pretty(analysis)?;
    fs::write(&path, json)
        .wrap_err_with(|| format!("failed to write analysis {}", path.display()))?;
    Ok(path)
}

/// Writes the rendered plain-text summary report.
pub fn write_summary_text(outdir: &Path, summary: &str, stamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(outdir)
        .wrap_err_with(|| format!("failed to create output directory {}", outdir.display()))?;
    let path = outdir.join(format!("summary_report_{stamp}.txt"));
    fs::write(&path, summary)
        .wrap_err_with(|| format!("failed to write summary report {}", path.display()))?;
    Ok(path)
}

/// Loads stored probe reports from a single JSON file or from every
/// per-target `*.json` in a directory (combined `all_*` batches and
/// `analysis_*` outputs are skipped to avoid double counting).
///
/// A report that no longer matches the finding schema (an unknown status or
/// severity, a missing field) aborts the load with an error naming the
/// offending file: silently dropping it would skew every statistic computed
/// downstream.
pub fn load_reports(input: &Path) -> Result<Vec<TargetResult>> {
    if input.is_file() {
        return Ok(vec![load_report_file(input)?]);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(input)
        .wrap_err_with(|| format!("failed to read report directory {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.ends_with(".json") && !name.starts_with("all_") && !name.starts_with("analysis_")
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        warn!(directory = %input.display(), "No report files found.");
    }

    paths.iter().map(|path| load_report_file(path)).collect()
}

fn load_report_file(path: &Path) -> Result<TargetResult> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read report {}", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("malformed report {}", path.display()))
}
