//! SMSC gateway client: request building, credential injection and reply decoding.

use crate::decode::decode_reply;
use crate::dry_run::DryRunTransport;
use crate::transport::{HttpTransport, ReqwestTransport};
use mailer_core::config::GatewayConfig;
use mailer_core::{MailerError, MailerResult, MailingId};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// `fmt` selector asking the provider for JSON replies.
pub const RESPONSE_FORMAT_JSON: &str = "3";

/// The provider's closed set of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMethod {
    Send,
    Status,
}

impl GatewayMethod {
    pub fn name(&self) -> &'static str {
        match self {
            GatewayMethod::Send => "send",
            GatewayMethod::Status => "status",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            GatewayMethod::Send => "send.php",
            GatewayMethod::Status => "status.php",
        }
    }

    fn required_params(&self) -> [&'static str; 2] {
        match self {
            GatewayMethod::Send => ["phones", "mes"],
            GatewayMethod::Status => ["phone", "id"],
        }
    }
}

impl FromStr for GatewayMethod {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("send") {
            Ok(GatewayMethod::Send)
        } else if s.eq_ignore_ascii_case("status") {
            Ok(GatewayMethod::Status)
        } else {
            Err(MailerError::UnsupportedMethod(s.to_string()))
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// A mailing the provider accepted.
#[derive(Debug, Clone)]
pub struct GatewayResult {
    pub mailing_id: MailingId,
    /// Full provider reply, returned to the `/send/` caller.
    pub payload: Value,
}

pub struct SmscClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credentials: Credentials,
}

impl SmscClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Build a client from configuration, answering locally when `dry_run` is set.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let transport: Arc<dyn HttpTransport> = if config.dry_run {
            tracing::info!("SMS gateway running in dry-run mode");
            Arc::new(DryRunTransport::new())
        } else {
            tracing::info!(base_url = %config.base_url, login = %config.login, "SMS gateway client initialized");
            Arc::new(ReqwestTransport::new(config.timeout_ms))
        };
        Self::new(
            transport,
            config.base_url.clone(),
            Credentials {
                login: config.login.clone(),
                password: config.password.clone(),
            },
        )
    }

    /// Submit `text` to every recipient. Returns the provider-assigned mailing id.
    pub async fn submit(&self, recipients: &[String], text: &str) -> MailerResult<GatewayResult> {
        let phones = recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        let payload = self
            .invoke_method("send", &[("phones", phones), ("mes", text.to_string())])
            .await?;

        let mailing_id = payload
            .get("id")
            .and_then(MailingId::from_value)
            .ok_or_else(|| MailerError::MalformedResponse("reply carries no mailing id".to_string()))?;

        Ok(GatewayResult {
            mailing_id,
            payload,
        })
    }

    /// Ask the provider for the delivery status of one recipient of a mailing.
    pub async fn check_status(&self, phone: &str, mailing_id: &str) -> MailerResult<Value> {
        self.invoke_method(
            "status",
            &[("phone", phone.to_string()), ("id", mailing_id.to_string())],
        )
        .await
    }

    /// Dispatch one provider method. Required parameters are checked before
    /// anything goes out on the network.
    pub async fn invoke_method(&self, name: &str, payload: &[(&str, String)]) -> MailerResult<Value> {
        let method: GatewayMethod = name.parse()?;

        let [first, second] = method.required_params();
        let present = |key: &str| payload.iter().any(|(k, v)| *k == key && !v.is_empty());
        if !present(first) || !present(second) {
            return Err(MailerError::InvalidRequest(format!(
                "'{first}' and '{second}' are required params"
            )));
        }

        let mut params = vec![
            ("login".to_string(), self.credentials.login.clone()),
            ("psw".to_string(), self.credentials.password.clone()),
            ("fmt".to_string(), RESPONSE_FORMAT_JSON.to_string()),
            ("charset".to_string(), "utf-8".to_string()),
        ];
        params.extend(payload.iter().map(|(k, v)| (k.to_string(), v.clone())));

        let url = format!("{}/{}", self.base_url, method.endpoint());
        debug!(method = method.name(), url = %url, "Calling SMS gateway");
        metrics::counter!("gateway.requests", "method" => method.name()).increment(1);

        let response = self.transport.get(&url, &params).await?;
        let result = decode_reply(&response)?.into_result();

        if let Err(MailerError::GatewayRejected(message)) = &result {
            warn!(method = method.name(), error = %message, "SMS gateway rejected request");
            metrics::counter!("gateway.rejections", "method" => method.name()).increment(1);
        }
        result
    }
}
