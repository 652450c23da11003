//! Persistence contract for mailing records.
//!
//! The store holds one record per mailing plus a registry of known mailing
//! ids. Submission writes new records, delivery confirmation rewrites
//! recipient states, and the synchronization loop only reads.

#![warn(clippy::unwrap_used)]

pub mod error;
pub mod memory;
pub mod redis_store;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryMailingStore;
pub use redis_store::RedisMailingStore;

use async_trait::async_trait;
use mailer_core::{DeliveryState, MailingId, MailingRecord};

#[async_trait]
pub trait MailingStore: Send + Sync {
    /// Every known mailing id, oldest first. May be empty.
    async fn list_mailing_ids(&self) -> StoreResult<Vec<MailingId>>;

    /// Fetch records for `ids`. The outer error means the batch call itself
    /// failed; inner errors are per record, in the same order as `ids`.
    async fn get_mailing_records(
        &self,
        ids: &[MailingId],
    ) -> StoreResult<Vec<StoreResult<MailingRecord>>>;

    /// Register a new mailing with every recipient pending.
    /// Fails with [`StoreError::AlreadyExists`] when `id` is taken.
    async fn create_mailing_record(
        &self,
        id: &MailingId,
        recipients: &[String],
        text: &str,
    ) -> StoreResult<()>;

    /// Move one recipient to `state`. The recipient must already belong to the mailing.
    async fn update_recipient_state(
        &self,
        id: &MailingId,
        phone: &str,
        state: DeliveryState,
    ) -> StoreResult<()>;
}
