//! GET /ws — mailing status stream.
//!
//! Every connection runs its own sync loop. The loop is dropped, and with it
//! any in-flight store call, as soon as the client closes, the socket errors
//! or the server shuts down.

use crate::rest::AppState;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use mailer_core::StatusUpdate;
use mailer_mailing::StatusSink;
use tokio::sync::watch;
use tracing::{debug, info};

pub async fn handle_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

async fn serve_subscriber(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let mut sink = WsStatusSink { sender };

    info!("Status subscriber connected");
    metrics::gauge!("ws.subscribers").increment(1.0);

    tokio::select! {
        _ = state.sync.run(&mut sink) => {}
        _ = wait_for_close(&mut receiver) => {
            debug!("Status subscriber closed the connection");
        }
        _ = wait_for_shutdown(state.shutdown.clone()) => {
            info!("Closing status stream for shutdown");
        }
    }

    metrics::gauge!("ws.subscribers").decrement(1.0);
    info!("Status subscriber disconnected");
}

struct WsStatusSink {
    sender: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl StatusSink for WsStatusSink {
    async fn publish(&mut self, update: &StatusUpdate) -> anyhow::Result<()> {
        let json = serde_json::to_string(update)?;
        self.sender.send(Message::Text(json)).await?;
        Ok(())
    }
}

/// Inbound messages are ignored; only close and errors matter.
async fn wait_for_close(receiver: &mut SplitStream<WebSocket>) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Resolves once the shutdown flag is raised. Never resolves if the sender is gone.
pub(crate) async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
