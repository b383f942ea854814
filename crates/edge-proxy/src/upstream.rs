use crate::error::ProxyError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// What the proxy keeps from an origin response. Everything else the origin
/// sent is dropped on purpose; the proxy rebuilds its own header set.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Outbound HTTP seam, injected into the handler so tests can substitute an
/// in-memory fake.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    /// GET `url` with the Host header forced to `host`. The inbound request's
    /// own Host names this proxy, and origins commonly reject it.
    async fn fetch(&self, url: &str, host: &str) -> Result<UpstreamResponse, ProxyError>;
}

/// Production transport backed by a shared `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::UpstreamFetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchTransport for HttpTransport {
    async fn fetch(&self, url: &str, host: &str) -> Result<UpstreamResponse, ProxyError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::HOST, host)
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamFetch(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamFetch(e.to_string()))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
