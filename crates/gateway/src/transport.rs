//! HTTP transport abstraction for reaching the gateway.
//!
//! [`HttpTransport`] hides the actual network call so the client's request
//! building and reply decoding can be tested without the provider.

use async_trait::async_trait;
use mailer_core::{MailerError, MailerResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Raw reply from the gateway. The status is not judged here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

/// Issues a single GET with query parameters.
///
/// Implementations fail only when no reply was received at all
/// (connection refused, DNS, timeout); that maps to `GatewayUnreachable`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, params: &[(String, String)]) -> MailerResult<TransportResponse>;
}

// ============================================================================
// Production implementation using reqwest
// ============================================================================

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// `timeout_ms = None` keeps reqwest's default, which has no deadline.
    pub fn new(timeout_ms: Option<u64>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[tracing::instrument(skip(self, params))]
    async fn get(&self, url: &str, params: &[(String, String)]) -> MailerResult<TransportResponse> {
        let mut req = self.client.get(url).query(params);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Gateway request failed");
            MailerError::GatewayUnreachable(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| MailerError::GatewayUnreachable(e.to_string()))?;

        tracing::debug!(
            url = %url,
            status = status,
            response_len = body.len(),
            "Gateway request completed"
        );

        Ok(TransportResponse { status, body })
    }
}

// ============================================================================
// Test/Mock implementation
// ============================================================================

/// Record of a call made to [`MockHttpTransport`].
#[derive(Debug, Clone)]
pub struct MockCall {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl MockCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport that replays queued responses in FIFO order and records every call.
#[derive(Clone, Default)]
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<MailerResult<TransportResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, response: MailerResult<TransportResponse>) {
        self.responses.lock().push_back(response);
    }

    /// Queue a 200 reply carrying `body` serialized as JSON.
    pub fn add_json(&self, body: serde_json::Value) {
        self.add_response(Ok(TransportResponse::ok(body.to_string())));
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> MailerResult<TransportResponse> {
        self.calls.lock().push(MockCall {
            url: url.to_string(),
            params: params.to_vec(),
        });

        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(MailerError::GatewayUnreachable(format!(
                "no mock response configured for {url}"
            )))
        })
    }
}
