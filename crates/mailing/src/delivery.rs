//! Pulling delivery confirmations from the gateway into the store.
//!
//! Not part of the synchronization loop, which only reads. Confirmation
//! processing calls this to move pending recipients to their final state.

use mailer_core::{DeliveryState, MailerError, MailerResult, MailingId};
use mailer_gateway::SmscClient;
use mailer_store::MailingStore;
use serde_json::Value;
use tracing::{debug, warn};

/// Ask the gateway about every pending recipient of `id` and record the
/// resolved ones. Returns how many recipients changed state.
///
/// A refusal for one recipient is logged and skipped; a transport failure
/// aborts the refresh, leaving already-written states in place.
pub async fn refresh_mailing(
    gateway: &SmscClient,
    store: &dyn MailingStore,
    id: &MailingId,
) -> MailerResult<usize> {
    let record = store
        .get_mailing_records(std::slice::from_ref(id))
        .await?
        .pop()
        .ok_or_else(|| MailerError::Store(format!("mailing {id} not returned")))??;

    let mut changed = 0;
    for phone in record.pending_recipients() {
        let payload = match gateway.check_status(phone, id.as_str()).await {
            Ok(payload) => payload,
            Err(e) if e.is_caller_facing() => {
                warn!(mailing_id = %id, phone = phone, error = %e, "Status check refused");
                continue;
            }
            Err(e) => return Err(e),
        };

        let Some(code) = status_code(&payload) else {
            warn!(mailing_id = %id, phone = phone, "Status reply carries no status code");
            continue;
        };

        let state = DeliveryState::from_provider_status(code);
        if state != DeliveryState::Pending {
            store.update_recipient_state(id, phone, state).await?;
            debug!(mailing_id = %id, phone = phone, state = state.as_str(), "Recipient resolved");
            changed += 1;
        }
    }

    metrics::counter!("delivery.recipients_resolved").increment(changed as u64);
    Ok(changed)
}

fn status_code(payload: &Value) -> Option<i64> {
    match payload.get("status")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailer_gateway::{Credentials, MockHttpTransport};
    use mailer_store::InMemoryMailingStore;
    use serde_json::json;
    use std::sync::Arc;

    fn gateway(mock: &MockHttpTransport) -> SmscClient {
        SmscClient::new(
            Arc::new(mock.clone()),
            "https://smsc.example/sys",
            Credentials {
                login: "acme".to_string(),
                password: "secret".to_string(),
            },
        )
    }

    async fn store_with(id: &MailingId, phones: &[&str]) -> InMemoryMailingStore {
        let store = InMemoryMailingStore::new();
        let phones: Vec<String> = phones.iter().map(|p| p.to_string()).collect();
        store.create_mailing_record(id, &phones, "hi").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_resolves_pending_recipients() {
        let id = MailingId::new("42");
        let store = store_with(&id, &["a", "b", "c"]).await;
        let mock = MockHttpTransport::new();
        // BTreeMap order: a, b, c
        mock.add_json(json!({"status": 1}));
        mock.add_json(json!({"status": 20}));
        mock.add_json(json!({"status": -1}));

        let changed = refresh_mailing(&gateway(&mock), &store, &id).await.unwrap();
        assert_eq!(changed, 2);

        let records = store.get_mailing_records(&[id]).await.unwrap();
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.recipients["a"], DeliveryState::Delivered);
        assert_eq!(record.recipients["b"], DeliveryState::Failed);
        assert_eq!(record.recipients["c"], DeliveryState::Pending);

        let calls = mock.get_calls();
        assert_eq!(calls[0].param("phone"), Some("a"));
        assert_eq!(calls[0].param("id"), Some("42"));
    }

    #[tokio::test]
    async fn test_resolved_recipients_are_not_queried_again() {
        let id = MailingId::new("1");
        let store = store_with(&id, &["a", "b"]).await;
        store
            .update_recipient_state(&id, "a", DeliveryState::Delivered)
            .await
            .unwrap();
        let mock = MockHttpTransport::new();
        mock.add_json(json!({"status": "1"}));

        let changed = refresh_mailing(&gateway(&mock), &store, &id).await.unwrap();
        assert_eq!(changed, 1);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.get_calls()[0].param("phone"), Some("b"));
    }

    #[tokio::test]
    async fn test_rejection_skips_recipient() {
        let id = MailingId::new("1");
        let store = store_with(&id, &["a", "b"]).await;
        let mock = MockHttpTransport::new();
        mock.add_json(json!({"error": "message not found", "error_code": 9}));
        mock.add_json(json!({"status": 1}));

        let changed = refresh_mailing(&gateway(&mock), &store, &id).await.unwrap();
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn test_unknown_mailing_is_store_error() {
        let store = InMemoryMailingStore::new();
        let mock = MockHttpTransport::new();
        let err = refresh_mailing(&gateway(&mock), &store, &MailingId::new("404"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailerError::Store(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let id = MailingId::new("1");
        let store = store_with(&id, &["a"]).await;
        let mock = MockHttpTransport::new();

        let err = refresh_mailing(&gateway(&mock), &store, &id).await.unwrap_err();
        assert!(matches!(err, MailerError::GatewayUnreachable(_)));
    }
}
