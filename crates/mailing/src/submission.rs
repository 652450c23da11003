//! Handling of one inbound "send an SMS mailing" request.

use mailer_core::{MailerError, MailerResult};
use mailer_gateway::SmscClient;
use mailer_store::MailingStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct SubmissionHandler {
    gateway: Arc<SmscClient>,
    store: Arc<dyn MailingStore>,
    fallback_recipients: Vec<String>,
}

impl SubmissionHandler {
    pub fn new(
        gateway: Arc<SmscClient>,
        store: Arc<dyn MailingStore>,
        fallback_recipients: Vec<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            fallback_recipients,
        }
    }

    /// Send `text` to the configured fallback recipients. The inbound
    /// `/send/` form carries only the text.
    pub async fn send_text(&self, text: &str) -> MailerResult<Value> {
        self.submit(&self.fallback_recipients, text).await
    }

    /// Submit a mailing and record it with every recipient pending.
    /// Nothing is recorded unless the provider accepted the mailing.
    pub async fn submit(&self, recipients: &[String], text: &str) -> MailerResult<Value> {
        let recipients: Vec<String> = recipients
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        let result = match self.gateway.submit(&recipients, text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, recipients = recipients.len(), "Mailing submission failed");
                metrics::counter!("mailing.submissions_failed").increment(1);
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .create_mailing_record(&result.mailing_id, &recipients, text)
            .await
        {
            error!(
                mailing_id = %result.mailing_id,
                error = %e,
                "Gateway accepted mailing but the record could not be stored"
            );
            metrics::counter!("mailing.record_failures").increment(1);
            return Err(MailerError::from(e));
        }

        info!(
            mailing_id = %result.mailing_id,
            recipients = recipients.len(),
            text_len = text.len(),
            "Mailing submitted"
        );
        metrics::counter!("mailing.submissions").increment(1);

        Ok(result.payload)
    }
}
