// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::scanner::DEFAULT_TIMEOUT_SECS;

/// Built-in target registry: logical name and base URL of the local test
/// applications the scanner was written for.
pub const KNOWN_TARGETS: &[(&str, &str)] = &[
    ("dvwa", "http://localhost:8081"),
    ("bwapp", "http://localhost:8082"),
    ("xvwa", "http://localhost:8083"),
    ("juice-shop", "http://localhost:3000"),
    ("opencart", "http://localhost:8084"),
];

#[derive(Parser, Debug)]
#[command(name = "headguard", version, about = "HTTP security header compliance scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe targets and write per-target JSON reports and CSV summaries
    Scan {
        /// Comma-separated targets: `all`, known names, or `name=url` pairs
        #[arg(long)]
        targets: String,
        /// Output directory for raw JSON reports
        #[arg(long, default_value = "data/raw_reports")]
        outdir: PathBuf,
        /// Output directory for per-target CSV summaries
        #[arg(long, default_value = "data/processed")]
        processed_dir: PathBuf,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
    },
    /// Aggregate stored reports into cross-target statistics and a summary
    Analyze {
        /// Input JSON report file, or a directory of per-target reports
        #[arg(long)]
        input: PathBuf,
        /// Output directory for the analysis JSON and summary text
        #[arg(long, default_value = "data/processed")]
        output: PathBuf,
    },
}

/// Resolves a `--targets` spec into `(name, url)` pairs.
///
/// `all` expands to the whole registry; a known name resolves to its
/// registered URL; `name=url` adds an ad-hoc target. Unknown bare names are
/// returned separately so the caller can log and skip them, matching the
/// degrade-dont-abort behavior of the probes themselves.
pub fn resolve_targets(spec: &str) -> (Vec<(String, String)>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut unknown = Vec::new();

    for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if entry == "all" {
            for (name, url) in KNOWN_TARGETS {
                resolved.push((name.to_string(), url.to_string()));
            }
        } else if let Some((name, url)) = entry.split_once('=') {
            resolved.push((name.trim().to_string(), url.trim().to_string()));
        } else if let Some((name, url)) = KNOWN_TARGETS.iter().find(|(name, _)| *name == entry) {
            resolved.push((name.to_string(), url.to_string()));
        } else {
            unknown.push(entry.to_string());
        }
    }

    (resolved, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_the_registry() {
        let (resolved, unknown) = resolve_targets("all");
        assert_eq!(resolved.len(), KNOWN_TARGETS.len());
        assert!(unknown.is_empty());
        assert_eq!(resolved[0].0, "dvwa");
    }

    #[test]
    fn known_names_and_adhoc_pairs_resolve() {
        let (resolved, unknown) =
            resolve_targets("dvwa, juice-shop, staging=https://staging.example.com");
        assert_eq!(
            resolved,
            vec![
                ("dvwa".to_string(), "http://localhost:8081".to_string()),
                ("juice-shop".to_string(), "http://localhost:3000".to_string()),
                (
                    "staging".to_string(),
                    "https://staging.example.com".to_string()
                ),
            ]
        );
        assert!(unknown.is_empty());
    }

    #[test]
    fn unknown_names_are_reported_not_resolved() {
        let (resolved, unknown) = resolve_targets("dvwa,nosuch");
        assert_eq!(resolved.len(), 1);
        assert_eq!(unknown, vec!["nosuch".to_string()]);
    }
}
