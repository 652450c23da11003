use mailer_core::{MailerError, MailingId};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("mailing {0} not found")]
    NotFound(MailingId),

    #[error("mailing {0} already exists")]
    AlreadyExists(MailingId),

    #[error("recipient {phone} is not part of mailing {mailing_id}")]
    UnknownRecipient { mailing_id: MailingId, phone: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("undecodable mailing record: {0}")]
    Decode(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

impl From<StoreError> for MailerError {
    fn from(e: StoreError) -> Self {
        MailerError::Store(e.to_string())
    }
}
