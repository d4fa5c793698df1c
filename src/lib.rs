//! tlsgrade Library
//!
//! A Rust library for grading the TLS configuration of public hosts through
//! the SSL Labs `analyze` API. This library provides functionality to:
//!
//! - Validate hosts and analysis options
//! - Build the initial and follow-up request URLs
//! - Poll the service until the analysis reaches a terminal status
//! - Render the report as text, styled text, JSON or YAML
//!
//! # Example
//!
//! ```rust,no_run
//! use tlsgrade::{AnalysisRequest, Config, TlsGrader};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> tlsgrade::Result<()> {
//! let request = AnalysisRequest::builder("www.example.com").publish(true).build()?;
//! let grader = TlsGrader::new(&Config::default())?;
//! let report = grader.analyze(&request, &CancellationToken::new()).await?;
//! println!("{} endpoint(s), best grade {:?}", report.endpoints.len(), report.best_grade());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain_utils;
pub mod errors;
pub mod facade;
pub mod output;
pub mod poll;
pub mod request;
pub mod structured_output;
pub mod styled_output;
pub mod telemetry;
pub mod transport;

// Re-export commonly used types and functions for convenience
pub use analysis::{AnalysisReport, AnalysisStatus, EndpointResult};
pub use config::Config;
pub use errors::{Result, TlsGradeError};
pub use facade::TlsGrader;
pub use poll::{PollConfig, PollDriver};
pub use request::{AnalysisRequest, AnalysisUrls, RequestBuilder};
pub use transport::{AnalysisTransport, HttpTransport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
