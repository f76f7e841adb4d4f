// src/main.rs

use clap::Parser;
use color_eyre::eyre::Result;
use std::path::Path;
use tracing::{info, warn};

mod cli;
mod core;
mod logging;
mod report;

use cli::{Cli, Commands};
use crate::core::{analysis, scanner};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            targets,
            outdir,
            processed_dir,
            timeout,
        } => run_scan(&targets, &outdir, &processed_dir, timeout).await,
        Commands::Analyze { input, output } => run_analyze(&input, &output),
    }
}

/// Probes the requested targets concurrently and persists one JSON report
/// and one CSV summary per target, plus the combined batch report.
async fn run_scan(spec: &str, outdir: &Path, processed_dir: &Path, timeout: u64) -> Result<()> {
    let (targets, unknown) = cli::resolve_targets(spec);
    for name in &unknown {
        warn!(target = name.as_str(), "Unknown target, skipping.");
    }
    if targets.is_empty() {
        warn!("No resolvable targets in '{spec}', nothing to scan.");
        return Ok(());
    }

    let client = scanner::build_client(timeout)?;
    let results = scanner::probe_all(&client, targets).await;

    let stamp = report::file_stamp(chrono::Utc::now());
    for result in &results {
        let json_path = report::write_target_report(outdir, result, &stamp)?;
        report::write_csv_summary(processed_dir, result, &stamp)?;
        info!(target = result.target.as_str(), path = %json_path.display(), "Results saved.");
    }
    let combined = report::write_combined_report(outdir, &results, &stamp)?;
    println!("Scanned {} target(s).", results.len());
    println!("Combined report: {}", combined.display());
    Ok(())
}

/// Loads stored reports, aggregates them, writes the analysis artifacts,
/// and prints the plain-text summary.
fn run_analyze(input: &Path, output: &Path) -> Result<()> {
    let results = report::load_reports(input)?;
    if results.is_empty() {
        println!("No data to analyze");
        return Ok(());
    }

    let analysis = analysis::analyze(&results);
    let generated_at = chrono::Utc::now();
    let stamp = report::file_stamp(generated_at);
    let analysis_path = report::write_analysis(output, &analysis, &stamp)?;
    let summary = analysis::render_summary(&analysis, generated_at);
    let summary_path = report::write_summary_text(output, &summary, &stamp)?;

    println!("Analysis completed!");
    println!("Analysis file: {}", analysis_path.display());
    println!("Summary report: {}", summary_path.display());
    println!();
    println!("{summary}");
    Ok(())
}
