// src/core/rules.rs

use tracing::debug;

use crate::core::models::{CheckName, Finding, HeaderBag, Severity, Status};

/// One year in seconds, the minimum acceptable HSTS `max-age`.
pub const HSTS_MIN_MAX_AGE: i64 = 31_536_000;

/// Sentinel recorded as a finding's value when the header is absent.
pub const MISSING: &str = "Missing";

/// Evaluates the header rule set against one probe's response.
///
/// Pure and side-effect-free: rules run in a fixed order, each appending
/// zero, one, or two findings. A missing or malformed header is itself a
/// finding, never an error. The HTTPS-redirect check is not part of this
/// function because it requires a second network probe; the fetch layer
/// appends [`https_redirect_missing`] after calling this.
pub fn evaluate(headers: &HeaderBag, status_code: u16) -> Vec<Finding> {
    debug!(status_code, header_count = headers.len(), "Evaluating header rules.");
    let mut findings = Vec::new();

    check_hsts(headers, &mut findings);
    check_csp(headers, &mut findings);
    check_content_type_options(headers, &mut findings);
    check_frame_options(headers, &mut findings);
    check_cookie_flags(headers, &mut findings);
    check_server_leak(headers, &mut findings);
    check_referrer_policy(headers, &mut findings);

    debug!(findings = findings.len(), "Header rule evaluation finished.");
    findings
}

/// Strict-Transport-Security: missing is a hard fail; a `max-age` below one
/// year is a warning; anything else passes.
fn check_hsts(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    match headers.get("Strict-Transport-Security") {
        None => findings.push(Finding::new(
            CheckName::Hsts,
            MISSING,
            Status::Fail,
            Severity::High,
            "HSTS header is missing - allows protocol downgrade attacks",
        )),
        Some(hsts) => {
            let max_age = extract_max_age(hsts);
            if max_age < HSTS_MIN_MAX_AGE {
                findings.push(Finding::new(
                    CheckName::Hsts,
                    format!("max-age={max_age}"),
                    Status::Warn,
                    Severity::Medium,
                    "HSTS max-age is less than 1 year",
                ));
            } else {
                findings.push(Finding::new(
                    CheckName::Hsts,
                    hsts,
                    Status::Pass,
                    Severity::Low,
                    "HSTS properly configured",
                ));
            }
        }
    }
}

/// Content-Security-Policy: missing or containing `unsafe-inline` / a
/// wildcard fails, anything else passes. No directive-level parsing.
fn check_csp(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    match headers.get("Content-Security-Policy") {
        None => findings.push(Finding::new(
            CheckName::Csp,
            MISSING,
            Status::Fail,
            Severity::High,
            "Content Security Policy is missing",
        )),
        Some(csp) => {
            if csp.contains("unsafe-inline") || csp.contains('*') {
                findings.push(Finding::new(
                    CheckName::Csp,
                    csp,
                    Status::Fail,
                    Severity::High,
                    "CSP contains unsafe directives (unsafe-inline or wildcard)",
                ));
            } else {
                findings.push(Finding::new(
                    CheckName::Csp,
                    csp,
                    Status::Pass,
                    Severity::Low,
                    "CSP properly configured",
                ));
            }
        }
    }
}

/// X-Content-Type-Options: only the exact value `nosniff` (case-insensitive)
/// passes. Absent fails, a wrong value warns, both at Medium severity.
fn check_content_type_options(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    match headers.get("X-Content-Type-Options") {
        Some(value) if value.to_lowercase() == "nosniff" => findings.push(Finding::new(
            CheckName::XContentTypeOptions,
            value,
            Status::Pass,
            Severity::Low,
            "X-Content-Type-Options properly configured",
        )),
        Some(value) => findings.push(Finding::new(
            CheckName::XContentTypeOptions,
            value,
            Status::Warn,
            Severity::Medium,
            "X-Content-Type-Options should be set to nosniff",
        )),
        None => findings.push(Finding::new(
            CheckName::XContentTypeOptions,
            MISSING,
            Status::Fail,
            Severity::Medium,
            "X-Content-Type-Options should be set to nosniff",
        )),
    }
}

/// Clickjacking protection: either X-Frame-Options or a `frame-ancestors`
/// directive anywhere in the CSP value counts.
fn check_frame_options(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    let x_frame_options = headers.get("X-Frame-Options");
    let csp_frame_ancestors = headers
        .get("Content-Security-Policy")
        .is_some_and(|csp| csp.contains("frame-ancestors"));

    if x_frame_options.is_none() && !csp_frame_ancestors {
        findings.push(Finding::new(
            CheckName::XFrameOptions,
            MISSING,
            Status::Fail,
            Severity::Medium,
            "X-Frame-Options or CSP frame-ancestors directive is missing",
        ));
    } else {
        findings.push(Finding::new(
            CheckName::XFrameOptions,
            x_frame_options.unwrap_or("CSP frame-ancestors"),
            Status::Pass,
            Severity::Low,
            "Clickjacking protection is configured",
        ));
    }
}

/// Cookie flags: substring checks on the single folded Set-Cookie string.
/// Emits zero, one, or two findings. Multiple Set-Cookie headers are not
/// modeled as a sequence (known limitation, see `HeaderBag`).
fn check_cookie_flags(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    let Some(set_cookie) = headers.get("Set-Cookie") else {
        return;
    };
    if !set_cookie.contains("HttpOnly") {
        findings.push(Finding::new(
            CheckName::CookieHttpOnly,
            MISSING,
            Status::Fail,
            Severity::High,
            "Cookie is missing HttpOnly flag",
        ));
    }
    if !set_cookie.contains("Secure") {
        findings.push(Finding::new(
            CheckName::CookieSecure,
            MISSING,
            Status::Fail,
            Severity::High,
            "Cookie is missing Secure flag",
        ));
    }
}

/// Server header: a decimal digit in the value is taken as version exposure.
/// A digit-free or absent Server header produces no finding.
fn check_server_leak(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    if let Some(server) = headers.get("Server") {
        if server.chars().any(|c| c.is_ascii_digit()) {
            findings.push(Finding::new(
                CheckName::ServerInfoLeak,
                server,
                Status::Warn,
                Severity::Low,
                "Server header contains version information",
            ));
        }
    }
}

/// Referrer-Policy: presence alone is sufficient, content is not validated.
fn check_referrer_policy(headers: &HeaderBag, findings: &mut Vec<Finding>) {
    if headers.get("Referrer-Policy").is_none() {
        findings.push(Finding::new(
            CheckName::ReferrerPolicy,
            MISSING,
            Status::Warn,
            Severity::Low,
            "Referrer-Policy header is missing",
        ));
    }
}

/// Extracts the `max-age` value from an HSTS header: first `;`-delimited
/// segment containing the substring `max-age`, integer after `=`, trimmed.
///
/// Any parse failure yields `0`, which deliberately conflates a malformed
/// header with an explicit `max-age=0`; both land on the too-short warning.
fn extract_max_age(hsts: &str) -> i64 {
    for part in hsts.split(';') {
        if part.contains("max-age") {
            return part
                .split('=')
                .nth(1)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
        }
    }
    0
}

// --- Probe-level failure findings ---
// These represent a failed probe rather than header non-compliance; when one
// is recorded, status code 0 is stored and no header rules run.

/// Finding for a request that could not complete the HTTP exchange.
pub fn connection_error(cause: &str) -> Finding {
    Finding::new(
        CheckName::ConnectionError,
        cause,
        Status::Fail,
        Severity::High,
        "Unable to connect to target",
    )
}

/// Finding for any other probe failure.
pub fn unexpected_error(cause: &str) -> Finding {
    Finding::new(
        CheckName::UnexpectedError,
        cause,
        Status::Fail,
        Severity::High,
        "Unexpected error occurred",
    )
}

/// Finding appended by the fetch layer when the HTTPS equivalent of a plain
/// HTTP target answers 200 but the HTTP request was never redirected.
pub fn https_redirect_missing() -> Finding {
    Finding::new(
        CheckName::HttpsRedirect,
        "HTTP to HTTPS redirect missing",
        Status::Fail,
        Severity::High,
        "HTTPS is available but HTTP does not redirect",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> HeaderBag {
        pairs.iter().copied().collect()
    }

    fn find(findings: &[Finding], name: CheckName) -> &Finding {
        findings
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no {name} finding"))
    }

    #[test]
    fn missing_hsts_is_a_single_high_fail() {
        let findings = evaluate(&bag(&[]), 200);
        let hsts: Vec<_> = findings.iter().filter(|f| f.name == CheckName::Hsts).collect();
        assert_eq!(hsts.len(), 1);
        assert_eq!(hsts[0].status, Status::Fail);
        assert_eq!(hsts[0].severity, Severity::High);
        assert_eq!(hsts[0].value, MISSING);
    }

    #[test]
    fn hsts_one_year_passes() {
        let findings = evaluate(&bag(&[("Strict-Transport-Security", "max-age=31536000")]), 200);
        let hsts = find(&findings, CheckName::Hsts);
        assert_eq!(hsts.status, Status::Pass);
        assert_eq!(hsts.severity, Severity::Low);
        assert_eq!(hsts.value, "max-age=31536000");
    }

    #[test]
    fn short_hsts_max_age_warns_medium() {
        let findings = evaluate(&bag(&[("Strict-Transport-Security", "max-age=100")]), 200);
        let hsts = find(&findings, CheckName::Hsts);
        assert_eq!(hsts.status, Status::Warn);
        assert_eq!(hsts.severity, Severity::Medium);
        assert_eq!(hsts.value, "max-age=100");
    }

    #[test]
    fn malformed_hsts_max_age_is_treated_as_zero() {
        let findings = evaluate(&bag(&[("Strict-Transport-Security", "max-age=invalid")]), 200);
        let hsts = find(&findings, CheckName::Hsts);
        assert_eq!(hsts.status, Status::Warn);
        assert_eq!(hsts.severity, Severity::Medium);
        assert_eq!(hsts.value, "max-age=0");
    }

    #[test]
    fn hsts_with_directives_and_long_max_age_passes() {
        let raw = "max-age=63072000; includeSubDomains; preload";
        let findings = evaluate(&bag(&[("Strict-Transport-Security", raw)]), 200);
        let hsts = find(&findings, CheckName::Hsts);
        assert_eq!(hsts.status, Status::Pass);
        assert_eq!(hsts.value, raw);
    }

    #[test]
    fn extract_max_age_edge_cases() {
        assert_eq!(extract_max_age("max-age=31536000"), 31_536_000);
        assert_eq!(extract_max_age("includeSubDomains; max-age= 500 "), 500);
        assert_eq!(extract_max_age("max-age"), 0);
        assert_eq!(extract_max_age("preload"), 0);
        assert_eq!(extract_max_age("max-age=nonsense"), 0);
    }

    #[test]
    fn csp_with_unsafe_inline_fails_high() {
        let findings = evaluate(
            &bag(&[("Content-Security-Policy", "default-src 'self' 'unsafe-inline'")]),
            200,
        );
        let csp = find(&findings, CheckName::Csp);
        assert_eq!(csp.status, Status::Fail);
        assert_eq!(csp.severity, Severity::High);
    }

    #[test]
    fn csp_wildcard_fails_and_self_only_passes() {
        let wildcard = evaluate(&bag(&[("Content-Security-Policy", "img-src *")]), 200);
        assert_eq!(find(&wildcard, CheckName::Csp).status, Status::Fail);

        let strict = evaluate(&bag(&[("Content-Security-Policy", "default-src 'self'")]), 200);
        let csp = find(&strict, CheckName::Csp);
        assert_eq!(csp.status, Status::Pass);
        assert_eq!(csp.severity, Severity::Low);
    }

    #[test]
    fn content_type_options_wrong_value_warns_missing_fails() {
        let wrong = evaluate(&bag(&[("X-Content-Type-Options", "sniff")]), 200);
        let finding = find(&wrong, CheckName::XContentTypeOptions);
        assert_eq!(finding.status, Status::Warn);
        assert_eq!(finding.severity, Severity::Medium);

        let missing = evaluate(&bag(&[]), 200);
        let finding = find(&missing, CheckName::XContentTypeOptions);
        assert_eq!(finding.status, Status::Fail);
        assert_eq!(finding.severity, Severity::Medium);

        let ok = evaluate(&bag(&[("X-Content-Type-Options", "NoSniff")]), 200);
        assert_eq!(find(&ok, CheckName::XContentTypeOptions).status, Status::Pass);
    }

    #[test]
    fn csp_frame_ancestors_satisfies_clickjacking_check() {
        let findings = evaluate(
            &bag(&[("Content-Security-Policy", "default-src 'self'; frame-ancestors 'none'")]),
            200,
        );
        let xfo = find(&findings, CheckName::XFrameOptions);
        assert_eq!(xfo.status, Status::Pass);
        assert_eq!(xfo.severity, Severity::Low);
        assert_eq!(xfo.value, "CSP frame-ancestors");
    }

    #[test]
    fn x_frame_options_value_is_preferred_over_csp_marker() {
        let findings = evaluate(&bag(&[("X-Frame-Options", "DENY")]), 200);
        let xfo = find(&findings, CheckName::XFrameOptions);
        assert_eq!(xfo.status, Status::Pass);
        assert_eq!(xfo.value, "DENY");
    }

    #[test]
    fn missing_both_frame_protections_fails_medium() {
        let findings = evaluate(&bag(&[]), 200);
        let xfo = find(&findings, CheckName::XFrameOptions);
        assert_eq!(xfo.status, Status::Fail);
        assert_eq!(xfo.severity, Severity::Medium);
    }

    #[test]
    fn cookie_without_httponly_yields_one_finding() {
        let findings = evaluate(&bag(&[("Set-Cookie", "id=1; Secure")]), 200);
        let cookie: Vec<_> = findings
            .iter()
            .filter(|f| matches!(f.name, CheckName::CookieHttpOnly | CheckName::CookieSecure))
            .collect();
        assert_eq!(cookie.len(), 1);
        assert_eq!(cookie[0].name, CheckName::CookieHttpOnly);
        assert_eq!(cookie[0].status, Status::Fail);
        assert_eq!(cookie[0].severity, Severity::High);
    }

    #[test]
    fn bare_cookie_yields_both_flag_findings() {
        let findings = evaluate(&bag(&[("Set-Cookie", "id=1")]), 200);
        assert_eq!(find(&findings, CheckName::CookieHttpOnly).status, Status::Fail);
        assert_eq!(find(&findings, CheckName::CookieSecure).status, Status::Fail);
    }

    #[test]
    fn no_set_cookie_header_yields_no_cookie_findings() {
        let findings = evaluate(&bag(&[]), 200);
        assert!(!findings
            .iter()
            .any(|f| matches!(f.name, CheckName::CookieHttpOnly | CheckName::CookieSecure)));
    }

    #[test]
    fn server_version_leak_warns_low_only_when_digits_present() {
        let leaky = evaluate(&bag(&[("Server", "nginx/1.25.3")]), 200);
        let leak = find(&leaky, CheckName::ServerInfoLeak);
        assert_eq!(leak.status, Status::Warn);
        assert_eq!(leak.severity, Severity::Low);
        assert_eq!(leak.value, "nginx/1.25.3");

        let clean = evaluate(&bag(&[("Server", "nginx")]), 200);
        assert!(!clean.iter().any(|f| f.name == CheckName::ServerInfoLeak));
    }

    #[test]
    fn referrer_policy_presence_is_sufficient() {
        let present = evaluate(&bag(&[("Referrer-Policy", "no-referrer")]), 200);
        assert!(!present.iter().any(|f| f.name == CheckName::ReferrerPolicy));

        let absent = evaluate(&bag(&[]), 200);
        let finding = find(&absent, CheckName::ReferrerPolicy);
        assert_eq!(finding.status, Status::Warn);
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn empty_header_map_golden_expectation() {
        // Executes the whole rule set against a bare response: five findings
        // in evaluation order, no cookie or server findings.
        let findings = evaluate(&bag(&[]), 200);
        let names: Vec<_> = findings.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                CheckName::Hsts,
                CheckName::Csp,
                CheckName::XContentTypeOptions,
                CheckName::XFrameOptions,
                CheckName::ReferrerPolicy,
            ]
        );

        let high = findings.iter().filter(|f| f.severity == Severity::High).count();
        let medium = findings.iter().filter(|f| f.severity == Severity::Medium).count();
        let low = findings.iter().filter(|f| f.severity == Severity::Low).count();
        assert_eq!((high, medium, low), (2, 2, 1));

        let fails = findings.iter().filter(|f| f.status == Status::Fail).count();
        let warns = findings.iter().filter(|f| f.status == Status::Warn).count();
        assert_eq!((fails, warns), (4, 1));
    }

    #[test]
    fn probe_failure_findings_are_high_fails() {
        let conn = connection_error("connection refused");
        assert_eq!(conn.name, CheckName::ConnectionError);
        assert_eq!(conn.status, Status::Fail);
        assert_eq!(conn.severity, Severity::High);
        assert_eq!(conn.value, "connection refused");

        let unexpected = unexpected_error("relative URL without a base");
        assert_eq!(unexpected.name, CheckName::UnexpectedError);
        assert_eq!(unexpected.severity, Severity::High);

        let redirect = https_redirect_missing();
        assert_eq!(redirect.name, CheckName::HttpsRedirect);
        assert_eq!(redirect.status, Status::Fail);
    }
}
