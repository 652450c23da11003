//! Mailing records as stored, and the summaries pushed to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// Provider-assigned mailing identifier. The provider may hand it out as a
/// number or a string; it is kept as its decimal/string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailingId(String);

impl MailingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Read an identifier out of a provider JSON field.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MailingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MailingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Delivery state of one recipient within a mailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryState {
    /// Map a numeric message status from the provider's `status` call.
    pub fn from_provider_status(code: i64) -> Self {
        match code {
            // delivered, read, link followed
            1 | 2 | 4 => DeliveryState::Delivered,
            // expired, undeliverable, bad number, prohibited, no funds, unavailable
            3 | 20 | 22 | 23 | 24 | 25 => DeliveryState::Failed,
            _ => DeliveryState::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Pending => "pending",
            DeliveryState::Delivered => "delivered",
            DeliveryState::Failed => "failed",
        }
    }
}

/// A persisted mailing. The recipient key set is fixed at creation; only
/// the states change afterwards.
///
/// Field names on the wire match the records already held in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailingRecord {
    #[serde(rename = "sms_id")]
    pub mailing_id: MailingId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "phones_count", default)]
    pub total_recipients: Option<u32>,
    #[serde(rename = "phones", default)]
    pub recipients: BTreeMap<String, DeliveryState>,
}

impl MailingRecord {
    /// A freshly submitted mailing with every recipient pending.
    pub fn new(
        mailing_id: MailingId,
        recipients: &[String],
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        let recipients: BTreeMap<String, DeliveryState> = recipients
            .iter()
            .map(|phone| (phone.clone(), DeliveryState::Pending))
            .collect();
        Self {
            mailing_id,
            created_at: Some(created_at),
            text: Some(text.to_string()),
            total_recipients: Some(recipients.len() as u32),
            recipients,
        }
    }

    pub fn pending_recipients(&self) -> impl Iterator<Item = &str> {
        self.recipients
            .iter()
            .filter(|(_, state)| **state == DeliveryState::Pending)
            .map(|(phone, _)| phone.as_str())
    }
}

/// Aggregated view of one mailing, recomputed every synchronization cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MailingSummary {
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "SMSText")]
    pub sms_text: Option<String>,
    #[serde(rename = "mailingId")]
    pub mailing_id: String,
    #[serde(rename = "totalSMSAmount")]
    pub total_sms_amount: Option<u32>,
    #[serde(rename = "deliveredSMSAmount")]
    pub delivered_sms_amount: u32,
    #[serde(rename = "failedSMSAmount")]
    pub failed_sms_amount: u32,
}

pub const STATUS_MSG_TYPE: &str = "SMSMailingStatus";

/// One push-channel message: every known mailing's summary for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdate {
    #[serde(rename = "msgType")]
    pub msg_type: String,
    #[serde(rename = "SMSMailings")]
    pub sms_mailings: Vec<MailingSummary>,
}

impl StatusUpdate {
    pub fn new(sms_mailings: Vec<MailingSummary>) -> Self {
        Self {
            msg_type: STATUS_MSG_TYPE.to_string(),
            sms_mailings,
        }
    }
}
