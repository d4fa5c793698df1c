//! Plain-text rendering of analysis reports and the raw report writer.
//!
//! This module renders the parameter summary printed before an analysis and
//! the final report as aligned `label: value` rows. The styled terminal
//! variant lives in [`crate::styled_output`]; JSON/YAML documents in
//! [`crate::structured_output`].

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::analysis::{AnalysisReport, EndpointResult};
use crate::domain_utils::report_file_name;
use crate::errors::{IoResultExt, Result};
use crate::request::AnalysisRequest;

pub(crate) const BANNER_RULE: &str = "========================================";
pub(crate) const BANNER_TITLE: &str = "   SSL Labs TLS Security Analyzer";
pub(crate) const ENDPOINT_RULE: &str = "-------------------------------------";
pub(crate) const NOT_AVAILABLE: &str = "N/A";

/// Renders the human-facing parts of a run.
pub trait OutputFormatter {
    /// Banner and the parameters of the request about to be sent.
    fn format_request(&self, request: &AnalysisRequest) -> String;

    /// Final report, one block per endpoint.
    fn format_report(&self, report: &AnalysisReport) -> String;
}

/// Text output formatter
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format_request(&self, request: &AnalysisRequest) -> String {
        let mut output = String::new();
        output.push_str(BANNER_RULE);
        output.push('\n');
        output.push_str(BANNER_TITLE);
        output.push('\n');
        output.push_str(BANNER_RULE);
        output.push_str("\n\nParameters:\n");
        for (label, value) in request_rows(request) {
            output.push_str(&row(label, &value));
        }
        output.push('\n');
        output
    }

    fn format_report(&self, report: &AnalysisReport) -> String {
        let mut output = String::new();
        output.push('\n');
        output.push_str(BANNER_RULE);
        output.push('\n');
        for (label, value) in report_rows(report) {
            output.push_str(&row(label, &value));
        }

        for (i, endpoint) in report.endpoints.iter().enumerate() {
            let _ = write!(
                output,
                "\n{ENDPOINT_RULE}\n             Endpoint #{}\n{ENDPOINT_RULE}\n",
                i + 1
            );
            for (label, value) in endpoint_rows(endpoint) {
                output.push_str(&row(label, &value));
            }
        }

        output
    }
}

/// One aligned `label: value` line.
pub fn row(label: &str, value: &str) -> String {
    format!("{label:<20}: {value}\n")
}

pub(crate) fn request_rows(request: &AnalysisRequest) -> Vec<(&'static str, String)> {
    vec![
        ("Host", request.host().to_string()),
        ("Publish", request.publish().to_string()),
        ("StartNew", request.start_new().to_string()),
        ("FromCache", request.from_cache().to_string()),
        ("MaxAge", request.max_age().to_string()),
        ("All", request.all().to_string()),
        ("IgnoreMismatch", request.ignore_mismatch().to_string()),
    ]
}

pub(crate) fn report_rows(report: &AnalysisReport) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Domain", report.host.clone()),
        ("Port", report.port.to_string()),
        ("Protocol", or_na(&report.protocol).to_string()),
        ("IsPublic", report.is_public.to_string()),
        ("Status", report.status.to_string()),
    ];
    if let Some(message) = report.status_message.as_deref().filter(|m| !m.is_empty()) {
        rows.push(("StatusMessage", message.to_string()));
    }
    rows.extend([
        ("StartTime", format_millis_timestamp(report.start_time)),
        ("TestTime", format_millis_timestamp(report.test_time)),
        ("EngineVersion", or_na(&report.engine_version).to_string()),
        ("CriteriaVersion", or_na(&report.criteria_version).to_string()),
    ]);
    rows
}

/// Rows of one endpoint block. The grade is always the third row.
pub(crate) fn endpoint_rows(endpoint: &EndpointResult) -> Vec<(&'static str, String)> {
    vec![
        ("IP address", or_na(&endpoint.ip_address).to_string()),
        ("StatusMessage", or_na(&endpoint.status_message).to_string()),
        ("Grade", or_na(&endpoint.grade).to_string()),
        (
            "GradeTrustIgnored",
            or_na(&endpoint.grade_trust_ignored).to_string(),
        ),
        ("HasWarnings", endpoint.has_warnings.to_string()),
        ("IsExceptional", endpoint.is_exceptional.to_string()),
        ("Progress", endpoint.progress.to_string()),
        ("Duration", format_duration_ms(endpoint.duration)),
        ("Eta", endpoint.eta.to_string()),
        ("Delegation", endpoint.delegation.to_string()),
    ]
}

/// `N/A` for empty values.
pub fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

/// Epoch milliseconds as `YYYY-MM-DD HH:MM:SS UTC`; `N/A` for 0.
pub fn format_millis_timestamp(ms: i64) -> String {
    if ms == 0 {
        return NOT_AVAILABLE.to_string();
    }
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Milliseconds as `Xm Ys` (whole minutes, remaining whole seconds).
pub fn format_duration_ms(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

/// Write the captured payload to `<dir>/<host>_report.json`, creating `dir`
/// when missing. Returns the written path.
pub fn write_raw_report(dir: &Path, host: &str, raw: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_path(dir.display().to_string(), "create report directory")?;
    let path = dir.join(report_file_name(host));
    fs::write(&path, raw).with_path(path.display().to_string(), "write report")?;
    Ok(path)
}
