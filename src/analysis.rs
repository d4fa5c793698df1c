//! Shared analysis data structures consumed by the poll driver, façade and
//! output formatters.
//!
//! The shapes mirror the SSL Labs `analyze` response. Every struct tolerates
//! unknown fields and missing fields (zero values), since the service adds
//! fields over time.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Remote analysis status.
///
/// The set of statuses is open: anything not listed here is kept verbatim in
/// [`AnalysisStatus::Unrecognized`] instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisStatus {
    InQueue,
    Dns,
    InProgress,
    Ready,
    Error,
    Unrecognized(String),
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisStatus::InQueue => "IN_QUEUE",
            AnalysisStatus::Dns => "DNS",
            AnalysisStatus::InProgress => "IN_PROGRESS",
            AnalysisStatus::Ready => "READY",
            AnalysisStatus::Error => "ERROR",
            AnalysisStatus::Unrecognized(s) => s,
        }
    }

    /// `READY` and `ERROR` end the polling loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Ready | AnalysisStatus::Error)
    }

    /// One of the statuses the service documents for a running analysis.
    pub fn is_known_pending(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::InQueue | AnalysisStatus::Dns | AnalysisStatus::InProgress
        )
    }
}

impl Default for AnalysisStatus {
    fn default() -> Self {
        AnalysisStatus::Unrecognized(String::new())
    }
}

impl From<String> for AnalysisStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "IN_QUEUE" => AnalysisStatus::InQueue,
            "DNS" => AnalysisStatus::Dns,
            "IN_PROGRESS" => AnalysisStatus::InProgress,
            "READY" => AnalysisStatus::Ready,
            "ERROR" => AnalysisStatus::Error,
            _ => AnalysisStatus::Unrecognized(s),
        }
    }
}

impl From<&str> for AnalysisStatus {
    fn from(s: &str) -> Self {
        AnalysisStatus::from(s.to_string())
    }
}

impl From<AnalysisStatus> for String {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Unrecognized(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full response of the `analyze` endpoint for one host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisReport {
    /// Host echoed back by the service; empty when the request was rejected
    #[serde(deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(deserialize_with = "null_as_default")]
    pub port: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub protocol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_public: bool,
    #[schemars(with = "String")]
    #[serde(deserialize_with = "null_as_default")]
    pub status: AnalysisStatus,
    /// Service-provided explanation, present mostly alongside `ERROR`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Milliseconds since the epoch
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: i64,
    /// Milliseconds since the epoch
    #[serde(deserialize_with = "null_as_default")]
    pub test_time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub engine_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub criteria_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub endpoints: Vec<EndpointResult>,
    /// Pretty-printed copy of the complete response document, only set when
    /// the raw payload was requested.
    #[serde(skip)]
    pub raw_payload: Option<String>,
}

impl AnalysisReport {
    /// Progress shown while polling: the first endpoint's progress, 0 when
    /// the service has not listed endpoints yet.
    pub fn progress_percent(&self) -> u8 {
        self.endpoints
            .first()
            .map(|e| e.progress.clamp(0, 100) as u8)
            .unwrap_or(0)
    }

    /// Best grade across endpoints that have one.
    pub fn best_grade(&self) -> Option<&str> {
        self.graded_endpoints().min_by_key(|(rank, _)| *rank).map(|(_, g)| g)
    }

    /// Worst grade across endpoints that have one.
    pub fn worst_grade(&self) -> Option<&str> {
        self.graded_endpoints().max_by_key(|(rank, _)| *rank).map(|(_, g)| g)
    }

    pub fn any_warnings(&self) -> bool {
        self.endpoints.iter().any(|e| e.has_warnings)
    }

    fn graded_endpoints(&self) -> impl Iterator<Item = (u8, &str)> {
        self.endpoints
            .iter()
            .filter_map(|e| grade_rank(&e.grade).map(|rank| (rank, e.grade.as_str())))
    }
}

/// Per-IP result inside an [`AnalysisReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointResult {
    #[serde(deserialize_with = "null_as_default")]
    pub ip_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status_message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub grade: String,
    #[serde(deserialize_with = "null_as_default")]
    pub grade_trust_ignored: String,
    #[serde(deserialize_with = "null_as_default")]
    pub has_warnings: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_exceptional: bool,
    /// 0-100 while the endpoint is assessed; the service uses -1 before it starts
    #[serde(deserialize_with = "null_as_default")]
    pub progress: i32,
    /// Milliseconds
    #[serde(deserialize_with = "null_as_default")]
    pub duration: i64,
    /// Seconds
    #[serde(deserialize_with = "null_as_default")]
    pub eta: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub delegation: i32,
}

/// Rank a letter grade, lower is better. Unknown or empty grades rank as `None`.
pub fn grade_rank(grade: &str) -> Option<u8> {
    let rank = match grade.trim() {
        "A+" => 0,
        "A" => 1,
        "A-" => 2,
        "B" => 3,
        "C" => 4,
        "D" => 5,
        "E" => 6,
        "F" => 7,
        "T" => 8,
        "M" => 9,
        _ => return None,
    };
    Some(rank)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_keeps_unknown_values() {
        assert_eq!(AnalysisStatus::from("READY"), AnalysisStatus::Ready);
        assert_eq!(AnalysisStatus::from("IN_QUEUE"), AnalysisStatus::InQueue);
        assert_eq!(
            AnalysisStatus::from("PAUSED"),
            AnalysisStatus::Unrecognized("PAUSED".to_string())
        );
        assert_eq!(AnalysisStatus::from("PAUSED").to_string(), "PAUSED");
        assert!(AnalysisStatus::Error.is_terminal());
        assert!(!AnalysisStatus::Dns.is_terminal());
        assert!(!AnalysisStatus::from("PAUSED").is_known_pending());
    }

    #[test]
    fn decodes_service_document_with_unknown_fields() {
        let body = r#"{
            "host": "example.com",
            "port": 443,
            "protocol": "http",
            "isPublic": false,
            "status": "READY",
            "startTime": 1700000000000,
            "testTime": 1700000090000,
            "engineVersion": "2.3.0",
            "criteriaVersion": "2009q",
            "certs": [{"id": "abc"}],
            "endpoints": [
                {"ipAddress": "93.184.216.34", "grade": "A+", "progress": 100, "details": {}},
                {"ipAddress": "2606:2800::1", "grade": "B", "hasWarnings": true, "progress": 100}
            ]
        }"#;
        let report: AnalysisReport = serde_json::from_str(body).unwrap();
        assert_eq!(report.host, "example.com");
        assert_eq!(report.port, 443);
        assert_eq!(report.status, AnalysisStatus::Ready);
        assert_eq!(report.endpoints.len(), 2);
        assert_eq!(report.endpoints[0].ip_address, "93.184.216.34");
        assert_eq!(report.best_grade(), Some("A+"));
        assert_eq!(report.worst_grade(), Some("B"));
        assert!(report.any_warnings());
        assert!(report.raw_payload.is_none());
    }

    #[test]
    fn null_endpoints_and_missing_fields_take_zero_values() {
        let report: AnalysisReport =
            serde_json::from_str(r#"{"host": "example.com", "endpoints": null}"#).unwrap();
        assert!(report.endpoints.is_empty());
        assert_eq!(report.status, AnalysisStatus::Unrecognized(String::new()));
        assert_eq!(report.start_time, 0);
        assert_eq!(report.progress_percent(), 0);
    }

    #[test]
    fn null_scalars_take_zero_values() {
        let report: AnalysisReport = serde_json::from_str(
            r#"{"host":"example.com","status":"READY","engineVersion":null,"port":null,
                "statusMessage":null,"testTime":null,
                "endpoints":[{"ipAddress":"192.0.2.1","grade":null,"statusMessage":null,
                              "hasWarnings":null,"eta":null,"progress":100}]}"#,
        )
        .unwrap();
        assert_eq!(report.status, AnalysisStatus::Ready);
        assert_eq!(report.engine_version, "");
        assert_eq!(report.port, 0);
        assert_eq!(report.test_time, 0);
        assert!(report.status_message.is_none());

        let endpoint = &report.endpoints[0];
        assert_eq!(endpoint.ip_address, "192.0.2.1");
        assert_eq!(endpoint.grade, "");
        assert_eq!(endpoint.status_message, "");
        assert!(!endpoint.has_warnings);
        assert_eq!(endpoint.eta, 0);
        assert_eq!(endpoint.progress, 100);
        assert_eq!(report.best_grade(), None);
    }

    #[test]
    fn null_status_is_unrecognized() {
        let report: AnalysisReport =
            serde_json::from_str(r#"{"host":"example.com","status":null}"#).unwrap();
        assert_eq!(report.status, AnalysisStatus::Unrecognized(String::new()));
    }

    #[test]
    fn progress_comes_from_first_endpoint() {
        let mut report = AnalysisReport::default();
        report.endpoints.push(EndpointResult {
            progress: 42,
            ..Default::default()
        });
        report.endpoints.push(EndpointResult {
            progress: 90,
            ..Default::default()
        });
        assert_eq!(report.progress_percent(), 42);

        report.endpoints[0].progress = -1;
        assert_eq!(report.progress_percent(), 0);
    }

    #[test]
    fn grade_ranking() {
        assert!(grade_rank("A+") < grade_rank("A"));
        assert!(grade_rank("A-") < grade_rank("B"));
        assert!(grade_rank("F") < grade_rank("T"));
        assert_eq!(grade_rank(""), None);
        assert_eq!(grade_rank("Z"), None);
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let report = AnalysisReport {
            host: "example.com".into(),
            status: AnalysisStatus::InProgress,
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "IN_PROGRESS");
        assert!(json.get("rawPayload").is_none());
    }
}
