//! Local stand-in for the provider, used when no real gateway should be hit.

use crate::transport::{HttpTransport, TransportResponse};
use async_trait::async_trait;
use mailer_core::MailerResult;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Answers `send` with a fresh mailing id and `status` with "delivered".
pub struct DryRunTransport {
    next_id: AtomicU64,
}

impl DryRunTransport {
    /// Ids start from the current unix time in milliseconds so restarts
    /// do not collide with mailings already in the store.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(1);
        Self::starting_at(seed)
    }

    pub fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
        }
    }
}

impl Default for DryRunTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for DryRunTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> MailerResult<TransportResponse> {
        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default()
        };

        let body = if url.ends_with("send.php") {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let cnt = param("phones").split(',').filter(|p| !p.is_empty()).count();
            tracing::debug!(id = id, cnt = cnt, "Dry-run gateway accepted mailing");
            json!({"id": id, "cnt": cnt})
        } else if url.ends_with("status.php") {
            json!({"status": 1, "err": 0, "id": param("id"), "phone": param("phone")})
        } else {
            json!({"error": "unknown method", "error_code": 3})
        };

        Ok(TransportResponse::ok(body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Credentials, SmscClient};
    use std::sync::Arc;

    fn client() -> SmscClient {
        SmscClient::new(
            Arc::new(DryRunTransport::starting_at(100)),
            "https://smsc.ru/sys",
            Credentials {
                login: String::new(),
                password: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_each_send_gets_a_new_id() {
        let gateway = client();
        let first = gateway.submit(&["911".to_string()], "one").await.unwrap();
        let second = gateway.submit(&["911".to_string()], "two").await.unwrap();
        assert_eq!(first.mailing_id.as_str(), "100");
        assert_eq!(second.mailing_id.as_str(), "101");
        assert_eq!(first.payload["cnt"], 1);
    }

    #[tokio::test]
    async fn test_status_reports_delivered() {
        let payload = client().check_status("911", "100").await.unwrap();
        assert_eq!(payload["status"], 1);
    }
}
