//! Structured output module for JSON and YAML serialization.
//!
//! The document wraps the service report with tool metadata, the request
//! that produced it and a short summary, so scripts do not have to derive
//! grades or counts themselves.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisReport;
use crate::request::AnalysisRequest;

/// Root structure for all tlsgrade output in structured formats
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct GradeReportOutput {
    /// Tool version and metadata
    pub metadata: OutputMetadata,

    /// Parameters sent to the analysis service
    pub request: RequestInfo,

    /// Report as returned by the service
    pub report: AnalysisReport,

    /// Derived figures
    pub summary: ResultSummary,

    /// Non-fatal problems, e.g. the detailed report could not be saved
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

/// Tool metadata and versioning information
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct OutputMetadata {
    pub tool_name: String,
    pub version: String,
    /// Timestamp when the document was produced
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Version of this document layout
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct RequestInfo {
    pub host: String,
    pub publish: bool,
    pub start_new: bool,
    pub from_cache: bool,
    /// Hours, 0 when unset
    pub max_age: u32,
    pub all: bool,
    pub ignore_mismatch: bool,
    pub api_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ResultSummary {
    pub status: String,
    pub endpoint_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_grade: Option<String>,
    /// Any endpoint flagged with warnings
    pub has_warnings: bool,
    /// Where the detailed report was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_report_path: Option<String>,
}

impl GradeReportOutput {
    pub fn new(request: &AnalysisRequest, api_endpoint: &str, report: AnalysisReport) -> Self {
        let summary = ResultSummary {
            status: report.status.to_string(),
            endpoint_count: report.endpoints.len(),
            best_grade: report.best_grade().map(str::to_string),
            worst_grade: report.worst_grade().map(str::to_string),
            has_warnings: report.any_warnings(),
            raw_report_path: None,
        };

        Self {
            metadata: OutputMetadata {
                tool_name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now(),
                schema_version: "1.0.0".to_string(),
            },
            request: RequestInfo {
                host: request.host().to_string(),
                publish: request.publish(),
                start_new: request.start_new(),
                from_cache: request.from_cache(),
                max_age: request.max_age(),
                all: request.all(),
                ignore_mismatch: request.ignore_mismatch(),
                api_endpoint: api_endpoint.to_string(),
            },
            report,
            summary,
            warnings: Vec::new(),
        }
    }

    pub fn set_raw_report_path(&mut self, path: impl Into<String>) {
        self.summary.raw_report_path = Some(path.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Generate JSON schema for this output format
    pub fn generate_json_schema() -> Result<String> {
        let schema = schemars::schema_for!(GradeReportOutput);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
