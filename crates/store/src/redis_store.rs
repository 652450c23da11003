//! Redis-backed mailing store.
//!
//! Layout: each record is a JSON string at `{prefix}:mailing:{id}`; the
//! registry is a sorted set at `{prefix}:mailings` scored by creation time.

use crate::error::{StoreError, StoreResult};
use crate::MailingStore;
use async_trait::async_trait;
use chrono::Utc;
use mailer_core::config::RedisConfig;
use mailer_core::{DeliveryState, MailingId, MailingRecord};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct KeySpace {
    prefix: String,
}

impl KeySpace {
    fn registry(&self) -> String {
        format!("{}:mailings", self.prefix)
    }

    fn record(&self, id: &MailingId) -> String {
        format!("{}:mailing:{}", self.prefix, id)
    }

    /// Record and registry entry in one MULTI/EXEC. `ZADD NX` keeps the first
    /// creation time when an existing id is retried.
    fn create_pipeline(&self, id: &MailingId, json: &str, created_ms: i64) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(self.record(id))
            .arg(json)
            .arg("NX")
            .cmd("ZADD")
            .arg(self.registry())
            .arg("NX")
            .arg(created_ms)
            .arg(id.as_str());
        pipe
    }
}

/// Owns the process-wide Redis handle. Created at startup, dropped at shutdown.
pub struct RedisMailingStore {
    conn: ConnectionManager,
    keys: KeySpace,
}

impl RedisMailingStore {
    /// Connect and verify the server answers.
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        info!(url = %config.url, "Connecting to Redis");

        let mut info = config.url.as_str().into_connection_info()?;
        if let Some(password) = &config.password {
            info.redis.password = Some(password.clone());
        }
        let client = redis::Client::open(info)?;

        let mut conn = ConnectionManager::new(client).await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        Ok(Self {
            conn,
            keys: KeySpace {
                prefix: config.key_prefix.clone(),
            },
        })
    }

    /// Drop the store's `ConnectionManager`. The multiplexed connection closes
    /// once no clone of it remains.
    pub fn close(self) {
        drop(self.conn);
        info!("Redis mailing store closed");
    }
}

#[async_trait]
impl MailingStore for RedisMailingStore {
    async fn list_mailing_ids(&self) -> StoreResult<Vec<MailingId>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrange(self.keys.registry(), 0, -1).await?;
        Ok(ids.into_iter().map(MailingId::new).collect())
    }

    async fn get_mailing_records(
        &self,
        ids: &[MailingId],
    ) -> StoreResult<Vec<StoreResult<MailingRecord>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.keys.record(id)).collect();
        let mut conn = self.conn.clone();
        // MGET explicitly: a single key must still come back as an array.
        let raw: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(&mut conn).await?;

        Ok(ids
            .iter()
            .zip(raw)
            .map(|(id, json)| match json {
                Some(json) => serde_json::from_str(&json).map_err(StoreError::from),
                None => Err(StoreError::NotFound(id.clone())),
            })
            .collect())
    }

    async fn create_mailing_record(
        &self,
        id: &MailingId,
        recipients: &[String],
        text: &str,
    ) -> StoreResult<()> {
        let now = Utc::now();
        let record = MailingRecord::new(id.clone(), recipients, text, now);
        let json = serde_json::to_string(&record)?;

        let mut conn = self.conn.clone();
        let (created, _added): (Option<String>, i64) = self
            .keys
            .create_pipeline(id, &json, now.timestamp_millis())
            .query_async(&mut conn)
            .await?;
        if created.is_none() {
            return Err(StoreError::AlreadyExists(id.clone()));
        }

        debug!(mailing_id = %id, recipients = record.recipients.len(), "Mailing record created");
        Ok(())
    }

    // Read-modify-write: recipient states have a single writer role, so no WATCH.
    async fn update_recipient_state(
        &self,
        id: &MailingId,
        phone: &str,
        state: DeliveryState,
    ) -> StoreResult<()> {
        let key = self.keys.record(id);
        let mut conn = self.conn.clone();

        let json: Option<String> = conn.get(&key).await?;
        let mut record: MailingRecord = match json {
            Some(json) => serde_json::from_str(&json)?,
            None => return Err(StoreError::NotFound(id.clone())),
        };

        match record.recipients.get_mut(phone) {
            Some(current) => *current = state,
            None => {
                return Err(StoreError::UnknownRecipient {
                    mailing_id: id.clone(),
                    phone: phone.to_string(),
                })
            }
        }

        let json = serde_json::to_string(&record)?;
        let _: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(json)
            .arg("XX")
            .query_async(&mut conn)
            .await?;

        debug!(mailing_id = %id, phone = phone, state = state.as_str(), "Recipient state updated");
        Ok(())
    }
}
