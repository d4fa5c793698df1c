//! Host name utilities.
//!
//! The grading service only accepts public DNS names, so input is checked
//! against a dotted-hostname pattern ("one or more `label.` segments ending
//! in an alphabetic TLD of at least two letters") before anything is sent.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, TlsGradeError};

static VALID_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}$").expect("host pattern is a valid regex")
});

/// Normalize and validate a host supplied by the operator.
///
/// Surrounding whitespace and a single trailing dot are removed and the
/// result is lower-cased. Returns the normalized host.
pub fn validate_host(host: &str) -> Result<String> {
    let clean = clean_host_input(host);

    if clean.is_empty() {
        return Err(TlsGradeError::invalid_host(host, "a domain to analyse is required"));
    }

    if !VALID_HOST.is_match(&clean) {
        return Err(TlsGradeError::invalid_host(
            host,
            "expected a domain such as www.example.com",
        ));
    }

    Ok(clean)
}

/// Whether `host` would pass [`validate_host`].
pub fn is_valid_host(host: &str) -> bool {
    validate_host(host).is_ok()
}

/// File name used for the raw report of `host`.
pub fn report_file_name(host: &str) -> String {
    format!("{host}_report.json")
}

fn clean_host_input(host: &str) -> String {
    host.trim()
        .strip_suffix('.')
        .unwrap_or(host.trim())
        .to_lowercase()
}
