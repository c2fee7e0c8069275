//! Delivery of the metric registry to a Prometheus Pushgateway

use crate::{
    error::{AppError, Result},
    logging::Logger,
    metrics,
};
use async_trait::async_trait;
use prometheus::Registry;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use url::Url;

/// Sends the current state of a registry to a metrics gateway
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Push every family in `registry` under `job_name`.
    ///
    /// One attempt only; transport failures and non-success responses are
    /// reported as [`AppError::Delivery`].
    async fn deliver(&self, job_name: &str, gateway_host: &str, registry: &Registry) -> Result<()>;
}

/// Build the grouping URL `<gateway>/metrics/job/<job_name>`.
///
/// A gateway given as bare `host:port` is assumed to speak plain HTTP.
pub fn push_url(gateway_host: &str, job_name: &str) -> Result<Url> {
    let gateway_host = gateway_host.trim();
    let base = if gateway_host.contains("://") {
        gateway_host.to_string()
    } else {
        format!("http://{}", gateway_host)
    };

    let mut url = Url::parse(&base).map_err(|e| {
        AppError::config(format!("Invalid PUSHGATEWAY_HOST '{}': {}", gateway_host, e))
    })?;

    if url.host_str().is_none() {
        return Err(AppError::config(format!(
            "PUSHGATEWAY_HOST has no host: {}",
            gateway_host
        )));
    }

    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("PUSHGATEWAY_HOST cannot be a base URL: {}", gateway_host)))?
        .pop_if_empty()
        .extend(["metrics", "job", job_name]);

    Ok(url)
}

/// HTTP client for the Pushgateway push API
pub struct PushGatewayClient {
    client: Client,
    logger: Logger,
}

impl PushGatewayClient {
    /// Create a client with the default request timeout
    pub fn new(logger: Logger) -> Result<Self> {
        Self::with_timeout(logger, crate::defaults::DEFAULT_PUSH_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(logger: Logger, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("speedtest-pusher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, logger })
    }
}

#[async_trait]
impl Delivery for PushGatewayClient {
    async fn deliver(&self, job_name: &str, gateway_host: &str, registry: &Registry) -> Result<()> {
        let url = push_url(gateway_host, job_name)?;
        let body = metrics::encode(registry)
            .map_err(|e| AppError::delivery(format!("Failed to encode metrics: {}", e)))?;

        self.logger.debug("Exposition payload")
            .field("url", url.as_str())
            .field("payload", &body)
            .log()
            .await;

        // PUT replaces every metric in the job's group
        let response = self.client
            .put(url.clone())
            .header(CONTENT_TYPE, prometheus::TEXT_FORMAT)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(format!(
                "Pushgateway at {} answered {}: {}",
                url,
                status,
                detail.trim()
            )));
        }

        self.logger.debug("Pushgateway accepted metrics")
            .field("status", status.as_u16())
            .log()
            .await;

        Ok(())
    }
}
