//! HTTP front door: form-encoded ingestion endpoint and health check.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use engine_logging::{engine_error, engine_info, engine_warn};
use kindle_core::{parse_resend_flag, IngestOutcome, IngestRequest};
use kindle_engine::Pipeline;
use serde::Deserialize;
use tokio::net::TcpListener;

pub const INGEST_ROUTE: &str = "/api/sendToKindle";
pub const HEALTH_ROUTE: &str = "/api/health";

/// Captured pages can be large; the framework default is 2 MiB.
pub const MAX_FORM_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Form fields posted by the browser extension. Absent fields count as empty.
#[derive(Debug, Default, Deserialize)]
pub struct IngestForm {
    pub link: Option<String>,
    pub html: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "reSend")]
    pub re_send: Option<String>,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route(INGEST_ROUTE, post(send_to_kindle))
        .route(HEALTH_ROUTE, get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .with_state(AppState { pipeline })
}

pub async fn serve(listener: TcpListener, pipeline: Arc<Pipeline>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        engine_info!("Listening on http://{}{}", addr, INGEST_ROUTE);
    }
    axum::serve(listener, router(pipeline)).await
}

async fn send_to_kindle(State(state): State<AppState>, Form(form): Form<IngestForm>) -> Response {
    let force_resend = match parse_resend_flag(form.re_send.as_deref()) {
        Ok(flag) => flag,
        Err(err) => {
            engine_warn!("Rejected request: {}", err);
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let request = IngestRequest::new(
        form.link.unwrap_or_default(),
        form.title.unwrap_or_default(),
        form.html.unwrap_or_default(),
        force_resend,
    );

    // Detached so a client disconnect cannot cancel the run halfway.
    let pipeline = Arc::clone(&state.pipeline);
    let run = tokio::spawn(async move { pipeline.process(request).await });
    match run.await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => {
            engine_error!("Run aborted: {}", err);
            outcome_response(IngestOutcome::Failed(err.to_string()))
        }
    }
}

/// Maps a run outcome onto the status codes the extension understands.
pub fn outcome_response(outcome: IngestOutcome) -> Response {
    match outcome {
        IngestOutcome::Accepted { .. } => StatusCode::OK.into_response(),
        IngestOutcome::MissingContent { .. } => StatusCode::NO_CONTENT.into_response(),
        IngestOutcome::AlreadyReported => StatusCode::ALREADY_REPORTED.into_response(),
        IngestOutcome::Rejected(message) | IngestOutcome::Failed(message) => {
            (StatusCode::BAD_REQUEST, message).into_response()
        }
    }
}
