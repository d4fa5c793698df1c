//! Unified error handling for tlsgrade.
//!
//! The error model is `thiserror`-based and groups failures by the part of
//! the run that produced them:
//!   * Input: host validation and option conflicts, caught before any request
//!   * Analysis: the service answered but reported an unusable result
//!   * Budget: the attempt budget ran out before a terminal status
//!   * Cancelled: interrupted by the operator or by the overall deadline
//!   * Network / Internal: client construction, file I/O and logic errors
//!
//! Retryable per-attempt failures (connection errors, non-200 responses,
//! undecodable bodies) are *not* represented here; they live in
//! [`crate::poll::TransientFailure`] and never leave the poll loop.
//!
//! Usage:
//!   use tlsgrade::errors::{Result, TlsGradeError};
//!
//!   fn check(host: &str) -> Result<()> {
//!       Err(TlsGradeError::invalid_host(host, "missing TLD"))
//!   }

use std::io;

use thiserror::Error;

/// High-level classification for reporting and exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Analysis,
    Budget,
    Cancelled,
    Network,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Analysis => "analysis",
            ErrorCategory::Budget => "budget",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Network => "network",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Why a run stopped before reaching a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The cancellation token fired (Ctrl-C or an embedding caller).
    Interrupted,
    /// The overall wall-clock deadline elapsed.
    DeadlineExceeded,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Interrupted => f.write_str("interrupted"),
            CancelReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum TlsGradeError {
    // ------------------------ Input / Validation ----------------------------
    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("Incompatible options: {message}")]
    ConflictingOptions { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ---------------------------- Analysis ----------------------------------
    #[error("The API did not return a host for '{requested}' (the domain is probably wrong)")]
    MissingHostEcho { requested: String },

    #[error("SSL Labs reported an error while analysing {host}{}", format_status_message(.status_message))]
    RemoteError {
        host: String,
        status_message: Option<String>,
    },

    #[error("The analysis of {host} finished but no endpoints were reported")]
    NoEndpoints { host: String },

    // ----------------------------- Budget -----------------------------------
    #[error("The API did not complete the analysis after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    // --------------------------- Cancellation -------------------------------
    #[error("Analysis cancelled after {attempts} attempt(s): {reason}")]
    Cancelled { attempts: u32, reason: CancelReason },

    // ----------------------------- Network ----------------------------------
    #[error("Failed to build the HTTP client: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn format_status_message(message: &Option<String>) -> String {
    match message.as_deref() {
        Some(m) if !m.trim().is_empty() => format!(": {}", m.trim()),
        _ => String::new(),
    }
}

impl TlsGradeError {
    /// Categorize the error for reporting.
    pub fn category(&self) -> ErrorCategory {
        use TlsGradeError::*;
        match self {
            InvalidHost { .. } | ConflictingOptions { .. } | Configuration { .. } => {
                ErrorCategory::Input
            }

            MissingHostEcho { .. } | RemoteError { .. } | NoEndpoints { .. } => {
                ErrorCategory::Analysis
            }

            AttemptsExhausted { .. } => ErrorCategory::Budget,

            Cancelled { .. } => ErrorCategory::Cancelled,

            HttpClient { .. } => ErrorCategory::Network,

            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// True for the failures the remote service is responsible for
    /// (no host echo, `ERROR` status, `READY` without endpoints).
    pub fn is_fatal_analysis(&self) -> bool {
        self.category() == ErrorCategory::Analysis
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            TlsGradeError::Cancelled {
                reason: CancelReason::Interrupted,
                ..
            } => 130,
            _ => 1,
        }
    }

    // ---------------------------- Constructors -----------------------------

    pub fn invalid_host(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHost {
            host: host.into(),
            reason: reason.into(),
        }
    }

    pub fn conflicting_options(message: impl Into<String>) -> Self {
        Self::ConflictingOptions {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn missing_host_echo(requested: impl Into<String>) -> Self {
        Self::MissingHostEcho {
            requested: requested.into(),
        }
    }

    pub fn remote_error(host: impl Into<String>, status_message: Option<String>) -> Self {
        Self::RemoteError {
            host: host.into(),
            status_message,
        }
    }

    pub fn no_endpoints(host: impl Into<String>) -> Self {
        Self::NoEndpoints { host: host.into() }
    }

    pub fn attempts_exhausted(attempts: u32) -> Self {
        Self::AttemptsExhausted { attempts }
    }

    pub fn cancelled(attempts: u32, reason: CancelReason) -> Self {
        Self::Cancelled { attempts, reason }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, TlsGradeError>;

/// Map standard IO errors into `Io` variant (generic context).
impl From<io::Error> for TlsGradeError {
    fn from(e: io::Error) -> Self {
        TlsGradeError::Io {
            path: "<unknown>".into(),
            operation: "unspecified".into(),
            source: e,
        }
    }
}

impl From<reqwest::Error> for TlsGradeError {
    fn from(e: reqwest::Error) -> Self {
        TlsGradeError::HttpClient { source: e }
    }
}

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| TlsGradeError::io(path.into(), operation.into(), e))
    }
}
