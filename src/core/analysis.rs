// src/core/analysis.rs

use chrono::{DateTime, Utc};
use std::fmt::Write;
use tracing::debug;

use crate::core::models::{Analysis, TargetResult};

/// Folds a batch of probe results into one `Analysis`.
///
/// Single linear pass over every target and its findings. Status and
/// severity are closed enums, so the "unknown bucket" failure mode of a
/// stringly-typed aggregator cannot occur here; a malformed stored report
/// is rejected earlier, when it is deserialized. An empty batch produces a
/// well-formed all-zero analysis.
pub fn analyze(results: &[TargetResult]) -> Analysis {
    debug!(targets = results.len(), "Aggregating probe results.");
    let mut analysis = Analysis {
        total_targets: results.len() as u64,
        ..Analysis::default()
    };

    for result in results {
        let summary = analysis
            .target_summary
            .entry(result.target.clone())
            .or_default();

        for finding in &result.findings {
            analysis.total_findings += 1;
            summary.record(finding);

            *analysis.severity_counts.entry(finding.severity).or_insert(0) += 1;
            *analysis.status_counts.entry(finding.status).or_insert(0) += 1;
            analysis
                .header_stats
                .entry(finding.name.to_string())
                .or_default()
                .record(finding.status);
        }
    }

    debug!(
        total_findings = analysis.total_findings,
        "Aggregation finished."
    );
    analysis
}

/// Share of `count` in `total` as a percentage; `0.0` when the batch holds
/// no findings at all.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Renders the deterministic plain-text summary report.
///
/// Severities and statuses appear in their declared order, targets and
/// header names in lexical order. The only non-deterministic input is the
/// generation instant, which the caller passes in.
pub fn render_summary(analysis: &Analysis, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let total = analysis.total_findings;

    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "HTTP SECURITY HEADERS ANALYSIS REPORT");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);

    let _ = writeln!(out, "GENERAL STATISTICS");
    let _ = writeln!(out, "{}", "-".repeat(20));
    let _ = writeln!(out, "Total Targets Analyzed: {}", analysis.total_targets);
    let _ = writeln!(out, "Total Findings: {total}");
    let _ = writeln!(out);

    let _ = writeln!(out, "SEVERITY DISTRIBUTION");
    let _ = writeln!(out, "{}", "-".repeat(25));
    for (severity, count) in &analysis.severity_counts {
        let _ = writeln!(
            out,
            "{severity}: {count} ({:.1}%)",
            percentage(*count, total)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "STATUS DISTRIBUTION");
    let _ = writeln!(out, "{}", "-".repeat(20));
    for (status, count) in &analysis.status_counts {
        let _ = writeln!(
            out,
            "{}: {count} ({:.1}%)",
            status.to_string().to_uppercase(),
            percentage(*count, total)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "TARGET SUMMARIES");
    let _ = writeln!(out, "{}", "-".repeat(18));
    for (target, summary) in &analysis.target_summary {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", target.to_uppercase());
        let _ = writeln!(out, "  Total Findings: {}", summary.total_findings);
        let _ = writeln!(out, "  High Severity: {}", summary.high_severity);
        let _ = writeln!(out, "  Medium Severity: {}", summary.medium_severity);
        let _ = writeln!(out, "  Low Severity: {}", summary.low_severity);
        let _ = writeln!(out, "  Failed Checks: {}", summary.failed_checks);
        let _ = writeln!(out, "  Passed Checks: {}", summary.passed_checks);
        let _ = writeln!(out, "  Warnings: {}", summary.warnings);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "HEADER STATISTICS");
    let _ = writeln!(out, "{}", "-".repeat(18));
    for (header, stats) in &analysis.header_stats {
        let _ = writeln!(out);
        let _ = writeln!(out, "{header}:");
        let _ = writeln!(out, "  Total Checks: {}", stats.total);
        let _ = writeln!(out, "  Passed: {}", stats.pass);
        let _ = writeln!(out, "  Warnings: {}", stats.warn);
        let _ = writeln!(out, "  Failed: {}", stats.fail);
    }

    out
}
