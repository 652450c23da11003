pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{MailerError, MailerResult};
pub use types::{DeliveryState, MailingId, MailingRecord, MailingSummary, StatusUpdate};
