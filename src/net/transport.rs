//! Network transport trait and the reqwest-backed implementation.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::http::{Method, Request, Response};

use super::NetworkError;

/// HTTP request timeout in seconds.
///
/// The fetch strategies impose no timeout of their own; bounding the
/// transport here keeps a hung network attempt from blocking the cache
/// fallback indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Issues a request and returns a response, or fails at the transport
/// level. Implementations must not treat HTTP error statuses as failures.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Transport over a shared reqwest client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client, keeping the host's pool and settings.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NetworkTransport for HttpTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Options => reqwest::Method::OPTIONS,
        };

        let reply = self.client.request(method, request.url()).send().await?;

        let status = reply.status().as_u16();
        let mut response_headers = Vec::with_capacity(reply.headers().len());
        for (name, value) in reply.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.push((name.as_str().to_string(), value.to_string()));
            }
        }

        let body = reply.bytes().await?;
        debug!(url = %request.url(), status, bytes = body.len(), "network fetch complete");

        let mut response = Response::new(status, body);
        for (name, value) in response_headers {
            response = response.with_header(name, value);
        }
        Ok(response)
    }
}
