use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::analysis::AnalysisReport;
use crate::config::Config;
use crate::errors::Result;
use crate::poll::PollDriver;
use crate::request::{AnalysisRequest, AnalysisUrls, RequestBuilder};
use crate::transport::{AnalysisTransport, HttpTransport};

/// High-level façade providing library-consumable entry points.
///
/// Combines URL building and the poll loop. Nothing here prints; callers
/// render the returned [`AnalysisReport`] (or error) themselves.
pub struct TlsGrader {
    builder: RequestBuilder,
    driver: PollDriver,
}

impl TlsGrader {
    /// Grader talking to the configured endpoint over HTTPS.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.api)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Grader using a caller-supplied transport.
    pub fn with_transport(config: &Config, transport: Arc<dyn AnalysisTransport>) -> Result<Self> {
        Ok(Self {
            builder: RequestBuilder::new(&config.api.endpoint)?,
            driver: PollDriver::new(transport, config.polling.clone()),
        })
    }

    /// URLs that [`TlsGrader::analyze`] will request for `request`.
    pub fn urls_for(&self, request: &AnalysisRequest) -> AnalysisUrls {
        self.builder.build(request)
    }

    /// Run one analysis to completion.
    ///
    /// The full response document is captured into `raw_payload` when the
    /// request is in detailed mode.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        let urls = self.urls_for(request);
        debug!(initial = %urls.initial, follow_up = %urls.follow_up, "starting analysis");
        self.driver.poll(&urls, request.all(), cancel).await
    }
}
