//! The per-subscriber synchronization loop.
//!
//! Each cycle lists every known mailing, fetches the records, summarizes them
//! and publishes one [`StatusUpdate`]. Store failures are contained to the
//! cycle they happen in; only the subscriber going away ends the loop.
//! Dropping the `run` future cancels it at its current await point.

use crate::summary::summarize;
use async_trait::async_trait;
use mailer_core::StatusUpdate;
use mailer_store::MailingStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Destination of status updates, typically one websocket connection.
#[async_trait]
pub trait StatusSink: Send {
    /// Deliver one update whole. An error means the subscriber is gone.
    async fn publish(&mut self, update: &StatusUpdate) -> anyhow::Result<()>;
}

#[async_trait]
impl StatusSink for mpsc::Sender<StatusUpdate> {
    async fn publish(&mut self, update: &StatusUpdate) -> anyhow::Result<()> {
        self.send(update.clone())
            .await
            .map_err(|_| anyhow::anyhow!("status subscriber dropped"))
    }
}

#[derive(Clone)]
pub struct SyncLoop {
    store: Arc<dyn MailingStore>,
    interval: Duration,
}

impl SyncLoop {
    pub fn new(store: Arc<dyn MailingStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run cycles until the sink rejects an update.
    pub async fn run<S: StatusSink>(&self, sink: &mut S) {
        loop {
            if let Some(update) = self.collect_cycle().await {
                if let Err(e) = sink.publish(&update).await {
                    info!(error = %e, "Status subscriber disconnected, stopping sync loop");
                    return;
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One cycle's update, or `None` when the mailing list could not be read.
    /// Records that fail to load are left out and retried next cycle.
    pub async fn collect_cycle(&self) -> Option<StatusUpdate> {
        metrics::counter!("sync.cycles").increment(1);

        let ids = match self.store.list_mailing_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list mailings, skipping cycle");
                metrics::counter!("sync.cycle_failures").increment(1);
                return None;
            }
        };

        let records = match self.store.get_mailing_records(&ids).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, mailings = ids.len(), "Failed to fetch mailings, skipping cycle");
                metrics::counter!("sync.cycle_failures").increment(1);
                return None;
            }
        };

        let summaries: Vec<_> = ids
            .iter()
            .zip(records)
            .filter_map(|(id, record)| match record {
                Ok(record) => Some(summarize(&record)),
                Err(e) => {
                    warn!(mailing_id = %id, error = %e, "Skipping mailing this cycle");
                    metrics::counter!("sync.records_skipped").increment(1);
                    None
                }
            })
            .collect();

        debug!(mailings = summaries.len(), "Sync cycle collected");
        Some(StatusUpdate::new(summaries))
    }
}
