// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

// --- Core Data Models ---

/// Verdict category of a single check.
///
/// The declared order (`Pass < Warn < Fail`) is the stable rendering order
/// used by the summary report, so the derived `Ord` matters.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

/// Qualitative impact ranking of a finding.
///
/// Status and severity are assigned independently per rule branch: a `warn`
/// can carry `Medium` (HSTS max-age too short) or `Low` (Server version
/// leak). There is deliberately no mapping between the two enums.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, strum::Display,
)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Identifier of a checked property. The serialized spellings are part of
/// the report format and must stay byte-for-byte stable.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, strum::Display,
)]
pub enum CheckName {
    #[serde(rename = "HSTS")]
    #[strum(serialize = "HSTS")]
    Hsts,
    #[serde(rename = "CSP")]
    #[strum(serialize = "CSP")]
    Csp,
    #[serde(rename = "X-Content-Type-Options")]
    #[strum(serialize = "X-Content-Type-Options")]
    XContentTypeOptions,
    #[serde(rename = "X-Frame-Options")]
    #[strum(serialize = "X-Frame-Options")]
    XFrameOptions,
    #[serde(rename = "Cookie_HttpOnly")]
    #[strum(serialize = "Cookie_HttpOnly")]
    CookieHttpOnly,
    #[serde(rename = "Cookie_Secure")]
    #[strum(serialize = "Cookie_Secure")]
    CookieSecure,
    #[serde(rename = "Server_Info_Leak")]
    #[strum(serialize = "Server_Info_Leak")]
    ServerInfoLeak,
    #[serde(rename = "Referrer-Policy")]
    #[strum(serialize = "Referrer-Policy")]
    ReferrerPolicy,
    #[serde(rename = "HTTPS_Redirect")]
    #[strum(serialize = "HTTPS_Redirect")]
    HttpsRedirect,
    #[serde(rename = "Connection_Error")]
    #[strum(serialize = "Connection_Error")]
    ConnectionError,
    #[serde(rename = "Unexpected_Error")]
    #[strum(serialize = "Unexpected_Error")]
    UnexpectedError,
}

/// One rule's verdict on one header property for one probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub name: CheckName,
    /// Observed raw value, or the literal `"Missing"` sentinel.
    pub value: String,
    pub status: Status,
    pub severity: Severity,
    /// Human-readable rationale, stable per rule+status combination.
    pub remark: String,
}

impl Finding {
    pub fn new(
        name: CheckName,
        value: impl Into<String>,
        status: Status,
        severity: Severity,
        remark: &str,
    ) -> Self {
        Self {
            name,
            value: value.into(),
            status,
            severity,
            remark: remark.to_string(),
        }
    }
}

// --- Header Collection ---

/// Response headers as handed to the rule evaluator: one string value per
/// name, lookup case-insensitive, casing preserved as received.
///
/// The fetch layer folds duplicate header instances into a single string
/// before the bag is built. For `Set-Cookie` this means the rules inspect
/// one combined string rather than a sequence of cookies, which is a known
/// limitation inherited from the original checker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HeaderBag(BTreeMap<String, String>);

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup by header name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Inserts a header value, folding a duplicate name into the existing
    /// value with `", "` the way HTTP clients commonly join repeated headers.
    pub fn insert(&mut self, name: &str, value: &str) {
        let key = self
            .0
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        match self.0.entry(key) {
            Entry::Occupied(mut entry) => {
                let folded = entry.get_mut();
                folded.push_str(", ");
                folded.push_str(value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>, V: Into<String>> FromIterator<(S, V)> for HeaderBag {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (name, value) in iter {
            bag.insert(&name.into(), &value.into());
        }
        bag
    }
}

// --- Probe Outcome ---

/// Full outcome of one probe attempt: the raw response data plus the ordered
/// findings derived from it. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetResult {
    pub url: String,
    /// Logical name of the target (e.g. "juice-shop").
    pub target: String,
    pub timestamp: DateTime<Utc>,
    /// HTTP status code; `0` means the probe failed before any response.
    pub status_code: u16,
    pub headers: HeaderBag,
    /// Ordered findings, insertion order = rule evaluation order. Never
    /// empty on a successful probe, length 1 on a total connection failure.
    pub findings: Vec<Finding>,
}

// --- Aggregate Statistics ---

/// Per-check-name pass/warn/fail tallies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderStat {
    pub total: u64,
    pub pass: u64,
    pub warn: u64,
    pub fail: u64,
}

impl HeaderStat {
    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Pass => self.pass += 1,
            Status::Warn => self.warn += 1,
            Status::Fail => self.fail += 1,
        }
    }
}

/// Per-target counters mirroring the global distributions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSummary {
    pub total_findings: u64,
    pub high_severity: u64,
    pub medium_severity: u64,
    pub low_severity: u64,
    pub failed_checks: u64,
    pub passed_checks: u64,
    pub warnings: u64,
}

impl TargetSummary {
    pub fn record(&mut self, finding: &Finding) {
        self.total_findings += 1;
        match finding.severity {
            Severity::High => self.high_severity += 1,
            Severity::Medium => self.medium_severity += 1,
            Severity::Low => self.low_severity += 1,
        }
        match finding.status {
            Status::Pass => self.passed_checks += 1,
            Status::Warn => self.warnings += 1,
            Status::Fail => self.failed_checks += 1,
        }
    }
}

/// Cross-target aggregate over a batch of `TargetResult`s.
///
/// Invariants: `total_findings` equals the sum over all targets' finding
/// counts, and both `severity_counts` and `status_counts` sum to it. The
/// severity and status maps always carry every key, even at zero;
/// `header_stats` keys appear lazily for names actually observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Analysis {
    pub total_targets: u64,
    pub total_findings: u64,
    pub severity_counts: BTreeMap<Severity, u64>,
    pub status_counts: BTreeMap<Status, u64>,
    pub header_stats: BTreeMap<String, HeaderStat>,
    pub target_summary: BTreeMap<String, TargetSummary>,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            total_targets: 0,
            total_findings: 0,
            severity_counts: [Severity::High, Severity::Medium, Severity::Low]
                .into_iter()
                .map(|s| (s, 0))
                .collect(),
            status_counts: [Status::Pass, Status::Warn, Status::Fail]
                .into_iter()
                .map(|s| (s, 0))
                .collect(),
            header_stats: BTreeMap::new(),
            target_summary: BTreeMap::new(),
        }
    }
}
