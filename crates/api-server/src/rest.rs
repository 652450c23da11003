//! REST handlers for mailing submission and operational probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use mailer_core::MailerError;
use mailer_mailing::{SubmissionHandler, SyncLoop};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Shared application state for REST and websocket handlers.
#[derive(Clone)]
pub struct AppState {
    pub submission: Arc<SubmissionHandler>,
    pub sync: SyncLoop,
    /// Flips to `true` when the process starts shutting down.
    pub shutdown: watch::Receiver<bool>,
    pub start_time: Instant,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendErrorResponse {
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

/// POST /send/ — Submit a mailing with the given text.
///
/// Provider refusals and missing fields come back as 200 with
/// `errorMessage`; the caller reads the body, as with the provider itself.
/// A body that is not a urlencoded form counts as a missing text.
#[utoipa::path(
    post,
    path = "/send/",
    tag = "Mailings",
    request_body(content = SendForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Gateway reply with the assigned mailing id, or errorMessage"),
        (status = 502, description = "SMS gateway unreachable", body = SendErrorResponse),
        (status = 500, description = "Mailing could not be recorded", body = SendErrorResponse),
    )
)]
pub async fn handle_send(
    State(state): State<AppState>,
    form: Option<Form<SendForm>>,
) -> Response {
    let text = form.map(|Form(form)| form.text).unwrap_or_default();
    match state.submission.send_text(&text).await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) if e.is_caller_facing() => {
            warn!(error = %e, "Send request refused");
            metrics::counter!("api.send_refused").increment(1);
            error_response(StatusCode::OK, e.to_string())
        }
        Err(e @ (MailerError::GatewayUnreachable(_) | MailerError::MalformedResponse(_))) => {
            error!(error = %e, "SMS gateway call failed");
            metrics::counter!("api.errors").increment(1);
            error_response(StatusCode::BAD_GATEWAY, "SMS gateway unavailable".to_string())
        }
        Err(e) => {
            error!(error = %e, "Send request failed");
            metrics::counter!("api.errors").increment(1);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Mailing could not be recorded".to_string(),
            )
        }
    }
}

fn error_response(status: StatusCode, error_message: String) -> Response {
    (status, Json(SendErrorResponse { error_message })).into_response()
}

/// GET /health — Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /live — Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}
