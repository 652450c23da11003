//! Submission through the dry-run gateway, observed through the sync loop.

use mailer_core::MailerError;
use mailer_gateway::{Credentials, DryRunTransport, MockHttpTransport, SmscClient};
use mailer_mailing::{refresh_mailing, SubmissionHandler, SyncLoop};
use mailer_store::{InMemoryMailingStore, MailingStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn credentials() -> Credentials {
    Credentials {
        login: "acme".to_string(),
        password: "secret".to_string(),
    }
}

fn dry_run_gateway() -> Arc<SmscClient> {
    Arc::new(SmscClient::new(
        Arc::new(DryRunTransport::starting_at(1000)),
        "https://smsc.ru/sys",
        credentials(),
    ))
}

#[tokio::test]
async fn two_sends_are_tracked_independently() {
    let store = Arc::new(InMemoryMailingStore::new());
    let handler = SubmissionHandler::new(
        dry_run_gateway(),
        store.clone(),
        vec!["79778838763".to_string()],
    );

    let first = handler.send_text("Storm warning").await.unwrap();
    let second = handler.send_text("All clear").await.unwrap();
    assert_ne!(first["id"], second["id"]);

    let update = SyncLoop::new(store.clone(), Duration::from_secs(1))
        .collect_cycle()
        .await
        .unwrap();
    assert_eq!(update.sms_mailings.len(), 2);

    let texts: Vec<_> = update
        .sms_mailings
        .iter()
        .map(|s| s.sms_text.clone().unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["Storm warning", "All clear"]);
    for summary in &update.sms_mailings {
        assert_eq!(summary.total_sms_amount, Some(1));
        assert_eq!(summary.delivered_sms_amount, 0);
    }
}

#[tokio::test]
async fn confirmed_delivery_shows_up_next_cycle() {
    let store = Arc::new(InMemoryMailingStore::new());
    let gateway = dry_run_gateway();
    let handler = SubmissionHandler::new(gateway.clone(), store.clone(), vec!["911".to_string()]);
    handler.send_text("hello").await.unwrap();

    let ids = store.list_mailing_ids().await.unwrap();
    let changed = refresh_mailing(&gateway, store.as_ref(), &ids[0]).await.unwrap();
    assert_eq!(changed, 1);

    let update = SyncLoop::new(store, Duration::from_secs(1))
        .collect_cycle()
        .await
        .unwrap();
    assert_eq!(update.sms_mailings[0].delivered_sms_amount, 1);
    assert_eq!(update.sms_mailings[0].failed_sms_amount, 0);
}

#[tokio::test]
async fn rejected_submission_never_appears_in_sync() {
    let store = Arc::new(InMemoryMailingStore::new());
    let mock = MockHttpTransport::new();
    mock.add_json(json!({"error": "invalid phone number", "error_code": 7}));
    let gateway = Arc::new(SmscClient::new(
        Arc::new(mock),
        "https://smsc.ru/sys",
        credentials(),
    ));
    let handler = SubmissionHandler::new(gateway, store.clone(), vec!["1".to_string()]);

    let err = handler.send_text("hello").await.unwrap_err();
    assert!(matches!(err, MailerError::GatewayRejected(_)));

    assert!(store.list_mailing_ids().await.unwrap().is_empty());
    let update = SyncLoop::new(store, Duration::from_secs(1))
        .collect_cycle()
        .await
        .unwrap();
    assert!(update.sms_mailings.is_empty());
}
