//! In-process mailing store backed by DashMap.
//! Used by tests and local runs without Redis; supports injecting
//! listing and per-record failures.

use crate::error::{StoreError, StoreResult};
use crate::MailingStore;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use mailer_core::{DeliveryState, MailingId, MailingRecord};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct InMemoryMailingStore {
    records: DashMap<MailingId, MailingRecord>,
    /// Registry in creation order.
    order: Mutex<Vec<MailingId>>,
    fail_listing: AtomicBool,
    unreachable: DashSet<MailingId>,
}

impl InMemoryMailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing creation defaults.
    pub fn insert_record(&self, record: MailingRecord) {
        let id = record.mailing_id.clone();
        if self.records.insert(id.clone(), record).is_none() {
            self.order.lock().push(id);
        }
    }

    /// Make `list_mailing_ids` fail until reset.
    pub fn set_listing_failure(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make fetches of `id` fail until [`Self::restore`] is called.
    pub fn make_unreachable(&self, id: &MailingId) {
        self.unreachable.insert(id.clone());
    }

    pub fn restore(&self, id: &MailingId) {
        self.unreachable.remove(id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MailingStore for InMemoryMailingStore {
    async fn list_mailing_ids(&self) -> StoreResult<Vec<MailingId>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("listing unavailable".to_string()));
        }
        Ok(self.order.lock().clone())
    }

    async fn get_mailing_records(
        &self,
        ids: &[MailingId],
    ) -> StoreResult<Vec<StoreResult<MailingRecord>>> {
        Ok(ids
            .iter()
            .map(|id| {
                if self.unreachable.contains(id) {
                    return Err(StoreError::Backend(format!("mailing {id} unreachable")));
                }
                self.records
                    .get(id)
                    .map(|record| record.clone())
                    .ok_or_else(|| StoreError::NotFound(id.clone()))
            })
            .collect())
    }

    async fn create_mailing_record(
        &self,
        id: &MailingId,
        recipients: &[String],
        text: &str,
    ) -> StoreResult<()> {
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(MailingRecord::new(id.clone(), recipients, text, Utc::now()));
                self.order.lock().push(id.clone());
                Ok(())
            }
        }
    }

    async fn update_recipient_state(
        &self,
        id: &MailingId,
        phone: &str,
        state: DeliveryState,
    ) -> StoreResult<()> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        match record.recipients.get_mut(phone) {
            Some(current) => {
                *current = state;
                Ok(())
            }
            None => Err(StoreError::UnknownRecipient {
                mailing_id: id.clone(),
                phone: phone.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_and_list_in_creation_order() {
        let store = InMemoryMailingStore::new();
        store
            .create_mailing_record(&MailingId::new("2"), &phones(&["a"]), "first")
            .await
            .unwrap();
        store
            .create_mailing_record(&MailingId::new("1"), &phones(&["b"]), "second")
            .await
            .unwrap();

        let ids = store.list_mailing_ids().await.unwrap();
        assert_eq!(ids, vec![MailingId::new("2"), MailingId::new("1")]);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let store = InMemoryMailingStore::new();
        let id = MailingId::new("7");
        store
            .create_mailing_record(&id, &phones(&["a"]), "x")
            .await
            .unwrap();
        let err = store
            .create_mailing_record(&id, &phones(&["b"]), "y")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.list_mailing_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_preserves_input_order_and_marks_missing() {
        let store = InMemoryMailingStore::new();
        store
            .create_mailing_record(&MailingId::new("1"), &phones(&["a"]), "x")
            .await
            .unwrap();

        let records = store
            .get_mailing_records(&[MailingId::new("missing"), MailingId::new("1")])
            .await
            .unwrap();
        assert!(matches!(records[0], Err(StoreError::NotFound(_))));
        assert_eq!(records[1].as_ref().unwrap().mailing_id.as_str(), "1");
    }

    #[tokio::test]
    async fn test_update_keeps_recipient_set_fixed() {
        let store = InMemoryMailingStore::new();
        let id = MailingId::new("1");
        store
            .create_mailing_record(&id, &phones(&["a", "b"]), "x")
            .await
            .unwrap();

        store
            .update_recipient_state(&id, "a", DeliveryState::Delivered)
            .await
            .unwrap();
        let err = store
            .update_recipient_state(&id, "c", DeliveryState::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownRecipient { .. }));

        let records = store.get_mailing_records(&[id]).await.unwrap();
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.recipients.len(), 2);
        assert_eq!(record.recipients["a"], DeliveryState::Delivered);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryMailingStore::new();
        let id = MailingId::new("1");
        store
            .create_mailing_record(&id, &phones(&["a"]), "x")
            .await
            .unwrap();

        store.set_listing_failure(true);
        assert!(store.list_mailing_ids().await.is_err());
        store.set_listing_failure(false);

        store.make_unreachable(&id);
        let records = store.get_mailing_records(&[id.clone()]).await.unwrap();
        assert!(matches!(records[0], Err(StoreError::Backend(_))));

        store.restore(&id);
        let records = store.get_mailing_records(&[id]).await.unwrap();
        assert!(records[0].is_ok());
    }
}
