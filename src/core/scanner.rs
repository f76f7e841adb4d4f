// src/core/scanner.rs

use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::models::{Finding, HeaderBag, TargetResult};
use crate::core::rules;

/// Timeout for the primary probe request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Timeout for the secondary HTTPS-availability probe, which is best-effort.
const HTTPS_PROBE_TIMEOUT_SECS: u64 = 10;

/// Builds the shared HTTP client used for all primary probes.
pub fn build_client(timeout_secs: u64) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("headguard/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Folds a response's headers into a `HeaderBag`, joining duplicate names
/// and replacing non-UTF-8 values with a placeholder.
fn collect_headers(headers: &reqwest::header::HeaderMap) -> HeaderBag {
    let mut bag = HeaderBag::new();
    for (name, value) in headers {
        match value.to_str() {
            Ok(v) => bag.insert(name.as_str(), v),
            Err(_) => {
                warn!(header_name = name.as_str(), "Header contained invalid UTF-8.");
                bag.insert(name.as_str(), "[Invalid UTF-8]");
            }
        }
    }
    bag
}

/// Result shell for a probe that failed before any response was received:
/// status code 0, empty header map, the single failure finding.
pub fn failure_result(url: &str, target: &str, finding: Finding) -> TargetResult {
    TargetResult {
        url: url.to_string(),
        target: target.to_string(),
        timestamp: Utc::now(),
        status_code: 0,
        headers: HeaderBag::new(),
        findings: vec![finding],
    }
}

/// Probes one target and evaluates its security headers.
///
/// Sends a GET request (redirects followed), hands the materialized headers
/// and status code to the rule evaluator, and appends the HTTPS-redirect
/// finding when a plain-HTTP target never redirected even though its HTTPS
/// equivalent answers 200. A failed request degrades to a single
/// `Connection_Error` finding rather than an error; other targets are
/// unaffected.
pub async fn probe_target(client: &Client, target: &str, url: &str) -> TargetResult {
    info!(target, url, "Checking headers.");

    if let Err(e) = Url::parse(url) {
        error!(target, url, error = %e, "Target URL is not parseable.");
        return failure_result(url, target, rules::unexpected_error(&e.to_string()));
    }

    match client.get(url).send().await {
        Ok(response) => {
            let status_code = response.status().as_u16();
            let final_url = response.url().clone();
            info!(target, status = status_code, "Received HTTP response.");

            let headers = collect_headers(response.headers());
            let mut findings = rules::evaluate(&headers, status_code);

            // Second, soft probe: only for plain-HTTP targets that were not
            // already redirected to HTTPS by the primary request.
            if url.starts_with("http://") && final_url.scheme() != "https" {
                if https_equivalent_answers(url).await {
                    findings.push(rules::https_redirect_missing());
                }
            }

            TargetResult {
                url: url.to_string(),
                target: target.to_string(),
                timestamp: Utc::now(),
                status_code,
                headers,
                findings,
            }
        }
        Err(e) => {
            error!(target, url, error = %e, "Request failed.");
            failure_result(url, target, rules::connection_error(&e.to_string()))
        }
    }
}

/// Checks whether the `https://` equivalent of a plain-HTTP URL responds
/// with 200. Certificate validation is disabled and every failure is
/// swallowed: this probe decides whether to flag a missing redirect, it is
/// not a requirement on the target.
async fn https_equivalent_answers(http_url: &str) -> bool {
    let https_url = http_url.replacen("http://", "https://", 1);
    debug!(url = %https_url, "Probing HTTPS equivalent.");

    let client = match Client::builder()
        .timeout(Duration::from_secs(HTTPS_PROBE_TIMEOUT_SECS))
        .danger_accept_invalid_certs(true)
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    match client.get(&https_url).send().await {
        Ok(response) => response.status().as_u16() == 200,
        Err(e) => {
            debug!(url = %https_url, error = %e, "HTTPS equivalent unreachable.");
            false
        }
    }
}

/// Probes every target concurrently and collects the results in completion
/// order of the spawned tasks. Each probe is independent; a panicked task is
/// logged and dropped rather than aborting the batch.
pub async fn probe_all(client: &Client, targets: Vec<(String, String)>) -> Vec<TargetResult> {
    let mut handles = Vec::new();
    for (target, url) in targets {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            probe_target(&client, &target, &url).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => error!(error = %e, "Probe task failed to complete."),
        }
    }
    results
}
