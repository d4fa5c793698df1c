//! Analysis request model and URL construction.
//!
//! [`AnalysisRequest`] holds the operator's choices once validated;
//! [`RequestBuilder`] turns it into the pair of URLs the poll driver uses.

use url::Url;

use crate::domain_utils;
use crate::errors::{Result, TlsGradeError};

/// Public SSL Labs v2 `analyze` endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.ssllabs.com/api/v2/analyze";

const START_NEW: &str = "startNew";
const ON: &str = "on";

/// Validated analysis parameters for one host.
///
/// Built through [`AnalysisRequest::builder`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    host: String,
    publish: bool,
    start_new: bool,
    from_cache: bool,
    max_age: u32,
    all: bool,
    ignore_mismatch: bool,
}

impl AnalysisRequest {
    pub fn builder(host: impl Into<String>) -> AnalysisRequestBuilder {
        AnalysisRequestBuilder::new(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn publish(&self) -> bool {
        self.publish
    }

    pub fn start_new(&self) -> bool {
        self.start_new
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Maximum cached report age in hours, 0 when unset.
    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    /// Detailed mode: the full response document is captured and saved.
    pub fn all(&self) -> bool {
        self.all
    }

    pub fn ignore_mismatch(&self) -> bool {
        self.ignore_mismatch
    }
}

/// Builder for [`AnalysisRequest`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequestBuilder {
    host: String,
    publish: bool,
    start_new: bool,
    from_cache: bool,
    max_age: u32,
    all: bool,
    ignore_mismatch: bool,
}

impl AnalysisRequestBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn publish(mut self, enabled: bool) -> Self {
        self.publish = enabled;
        self
    }

    pub fn start_new(mut self, enabled: bool) -> Self {
        self.start_new = enabled;
        self
    }

    pub fn from_cache(mut self, enabled: bool) -> Self {
        self.from_cache = enabled;
        self
    }

    pub fn max_age(mut self, hours: u32) -> Self {
        self.max_age = hours;
        self
    }

    pub fn all(mut self, enabled: bool) -> Self {
        self.all = enabled;
        self
    }

    pub fn ignore_mismatch(mut self, enabled: bool) -> Self {
        self.ignore_mismatch = enabled;
        self
    }

    /// Validate and freeze the request.
    ///
    /// Fails when the host is not a dotted hostname, when `startNew` and
    /// `fromCache` are combined, or when `maxAge` is set without `fromCache`.
    pub fn build(self) -> Result<AnalysisRequest> {
        let host = domain_utils::validate_host(&self.host)?;

        if self.start_new && self.from_cache {
            return Err(TlsGradeError::conflicting_options(
                "startNew and fromCache cannot be used together",
            ));
        }
        if self.max_age > 0 && !self.from_cache {
            return Err(TlsGradeError::conflicting_options(
                "maxAge can only be used together with fromCache",
            ));
        }

        Ok(AnalysisRequest {
            host,
            publish: self.publish,
            start_new: self.start_new,
            from_cache: self.from_cache,
            max_age: self.max_age,
            all: self.all,
            ignore_mismatch: self.ignore_mismatch,
        })
    }
}

/// URLs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisUrls {
    /// Used for the first attempt only.
    pub initial: Url,
    /// Same query as `initial` without `startNew=on`.
    pub follow_up: Url,
}

/// Serializes [`AnalysisRequest`]s against a fixed endpoint.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: Url,
}

impl RequestBuilder {
    /// Create a builder for `endpoint`. A malformed endpoint is a
    /// configuration error.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            TlsGradeError::configuration(format!("Invalid API endpoint '{endpoint}': {e}"))
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(TlsGradeError::configuration(format!(
                "API endpoint must be an http(s) URL: {endpoint}"
            )));
        }

        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the initial and follow-up URLs for `request`.
    pub fn build(&self, request: &AnalysisRequest) -> AnalysisUrls {
        let mut initial = self.endpoint.clone();
        initial.set_fragment(None);
        {
            let mut query = initial.query_pairs_mut();
            query.append_pair("host", request.host());
            if request.publish() {
                query.append_pair("publish", ON);
            }
            if request.start_new() {
                query.append_pair(START_NEW, ON);
            }
            if request.from_cache() {
                query.append_pair("fromCache", ON);
            }
            if request.max_age() > 0 {
                query.append_pair("maxAge", &request.max_age().to_string());
            }
            if request.all() {
                query.append_pair("all", ON);
            }
            if request.ignore_mismatch() {
                query.append_pair("ignoreMismatch", ON);
            }
        }

        let follow_up = follow_up_url(&initial);
        AnalysisUrls { initial, follow_up }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_API_ENDPOINT).expect("default endpoint is a valid URL"),
        }
    }
}

/// Derive the polling URL: `initial` with every `startNew=on` pair removed.
pub fn follow_up_url(initial: &Url) -> Url {
    let kept: Vec<(String, String)> = initial
        .query_pairs()
        .filter(|(k, v)| !(k == START_NEW && v == ON))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut follow_up = initial.clone();
    if kept.is_empty() {
        follow_up.set_query(None);
    } else {
        follow_up.query_pairs_mut().clear().extend_pairs(kept);
    }
    follow_up
}
