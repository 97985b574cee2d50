//! HTTP transport for signed requests.
//!
//! The client builds and signs requests; a [`HttpTransport`] only moves them
//! over the network and decodes the JSON answer. Failures are terminal for
//! the call, there are no retries.

use std::time::Duration;

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use http::{HeaderMap, Method};
use serde_json::Value;

use crate::constants::{HEADER_X_IDENTITY, HEADER_X_SIGNATURE};
use crate::error::BitpayError;

/// A fully built request: URL, body and authentication headers.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub headers: HeaderMap,
}

impl SignedRequest {
    /// Value of the `x-identity` header.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.header(&HEADER_X_IDENTITY)
    }

    /// Value of the `x-signature` header.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.header(&HEADER_X_SIGNATURE)
    }

    fn header(&self, name: &http::header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends signed requests and decodes their JSON response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the decoded response body.
    ///
    /// Implementations return [`BitpayError::Transport`] when the request
    /// cannot be delivered and [`BitpayError::Decode`] when the answer is not
    /// JSON.
    async fn send(&self, request: SignedRequest) -> Result<Value, Report<BitpayError>>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport without a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Transport`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, Report<BitpayError>> {
        Self::with_timeout(None)
    }

    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Transport`] if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, Report<BitpayError>> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().change_context(BitpayError::Transport {
            message: "failed to create HTTP client".into(),
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: SignedRequest) -> Result<Value, Report<BitpayError>> {
        let SignedRequest {
            method,
            url,
            body,
            headers,
        } = request;

        let mut builder = self.client.request(method, &url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .change_context(BitpayError::Transport {
                message: format!("request to {url} failed"),
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("{} responded with HTTP {}", url, status);
        }

        response
            .json::<Value>()
            .await
            .change_context(BitpayError::Decode {
                message: format!("response from {url} is not valid JSON"),
            })
            .attach(format!("HTTP status: {status}"))
    }
}
