//! SMS Mailer — submits SMS mailings through the SMSC gateway and streams
//! their delivery status to websocket subscribers.
//!
//! Main entry point: loads configuration, acquires the mailing store, serves
//! HTTP until ctrl-c, then releases the store.

use anyhow::Context;
use clap::Parser;
use mailer_api::{ApiServer, AppState};
use mailer_core::config::AppConfig;
use mailer_gateway::SmscClient;
use mailer_mailing::{SubmissionHandler, SyncLoop};
use mailer_store::{InMemoryMailingStore, MailingStore, RedisMailingStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "sms-mailer")]
#[command(about = "SMS mailing submission and live delivery status")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "SMS_MAILER__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Verbose logging
    #[arg(long, env = "SMS_MAILER__DEBUG", default_value_t = false)]
    debug: bool,

    /// Keep mailings in process memory instead of Redis
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

const CRATE_TARGETS: [&str; 6] = [
    "sms_mailer",
    "mailer_api",
    "mailer_mailing",
    "mailer_gateway",
    "mailer_store",
    "tower_http",
];

fn default_log_filter(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let debug = cli.debug || loaded.as_ref().map(|c| c.debug).unwrap_or(false);

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(debug).into()),
        )
        .json()
        .init();

    info!("SMS Mailer starting up");

    // A broken environment must not fall back to dry-run defaults.
    let mut config = loaded
        .inspect_err(|e| error!(error = %e, "Failed to load config"))
        .context("invalid SMS_MAILER configuration")?;

    // Apply CLI overrides
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    config.debug = debug;
    config.validate()?;

    info!(
        http_port = config.api.http_port,
        dry_run = config.gateway.dry_run,
        recipients = config.mailing.fallback_recipients.len(),
        sync_interval_ms = config.mailing.sync_interval_ms,
        "Configuration loaded"
    );

    // Acquire the mailing store; released after the server stops
    let redis = if cli.in_memory {
        info!("Using in-memory mailing store");
        None
    } else {
        Some(Arc::new(RedisMailingStore::connect(&config.redis).await?))
    };
    let store: Arc<dyn MailingStore> = match &redis {
        Some(redis) => redis.clone(),
        None => Arc::new(InMemoryMailingStore::new()),
    };

    let gateway = Arc::new(SmscClient::from_config(&config.gateway));
    let submission = Arc::new(SubmissionHandler::new(
        gateway,
        store.clone(),
        config.mailing.fallback_recipients.clone(),
    ));
    let sync = SyncLoop::new(
        store.clone(),
        Duration::from_millis(config.mailing.sync_interval_ms),
    );
    drop(store);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            return;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let api_server = ApiServer::new(
        config.clone(),
        AppState {
            submission,
            sync,
            shutdown: shutdown_rx,
            start_time: Instant::now(),
        },
    );

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("SMS Mailer is ready to serve traffic");

    // Blocks until shutdown
    let served = api_server.start_http().await;
    drop(api_server);

    if let Some(redis) = redis {
        match Arc::try_unwrap(redis) {
            Ok(redis) => redis.close(),
            Err(_) => warn!("Mailing store still referenced at shutdown"),
        }
    }

    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn test_default_filter_covers_every_crate() {
        for debug in [false, true] {
            let filter = default_log_filter(debug);
            assert!(EnvFilter::try_new(&filter).is_ok());
            for target in ["mailer_gateway", "mailer_store", "mailer_mailing", "mailer_api"] {
                assert!(filter.contains(&format!("{target}=")), "{target} missing from {filter}");
            }
        }
        assert!(default_log_filter(false).contains("mailer_gateway=info"));
        assert!(default_log_filter(true).contains("mailer_store=debug"));
    }
}
