//! HTTP JSON API for Insight workflows.
//!
//! Exposes the workflow engine, the mock REST services, and the contact
//! relay as an axum service.
//!
//! Endpoints:
//! - GET    /health                                - Server status
//! - POST   /api/workflows                         - Create a workflow for a domain
//! - GET    /api/workflows                         - List workflow summaries
//! - GET    /api/workflows/{id}                    - Workflow snapshot
//! - DELETE /api/workflows/{id}                    - Stop and drop a workflow
//! - POST   /api/workflows/{id}/generate           - Generate a batch of records
//! - POST   /api/workflows/{id}/stream/start       - Start the live stream
//! - POST   /api/workflows/{id}/stream/stop        - Stop the live stream
//! - PUT    /api/workflows/{id}/criteria           - Replace filter criteria
//! - GET    /api/workflows/{id}/records            - Buffered or filtered records
//! - POST   /api/workflows/{id}/capsule            - Build the audit capsule
//! - POST   /api/workflows/{id}/anchor             - Anchor the capsule
//! - POST   /api/workflows/{id}/verify             - Verify the capsule
//! - POST   /api/workflows/{id}/reset              - Clear the run
//! - POST   /api/dataset-anchor, GET /api/dataset-anchor/{id}
//! - POST   /api/provenance, GET /api/provenance/{id}
//! - POST   /api/inference
//! - POST   /api/verify
//! - POST   /api/reports, GET /api/reports
//! - POST   /api/contact                           - Relay a contact form message
//!
//! Successful responses are `{success: true, data}`. Failures are
//! `{success: false, error, details}`, including a handler panic, which
//! becomes a 500.

mod error;
mod handlers;
mod mail;
mod state;
mod validation;

pub use error::{ApiError, FieldIssue};
pub use mail::{LogMailRelay, MailError, MailRelay, OutgoingMail};
pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post, put};
use axum::response::{IntoResponse, Response};
use log::{info, warn};
use std::any::Any as PanicPayload;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{contact, mock, workflows};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/api/workflows",
            post(workflows::handle_create).get(workflows::handle_list),
        )
        .route(
            "/api/workflows/{id}",
            get(workflows::handle_get).delete(workflows::handle_delete),
        )
        .route(
            "/api/workflows/{id}/generate",
            post(workflows::handle_generate),
        )
        .route(
            "/api/workflows/{id}/stream/start",
            post(workflows::handle_stream_start),
        )
        .route(
            "/api/workflows/{id}/stream/stop",
            post(workflows::handle_stream_stop),
        )
        .route(
            "/api/workflows/{id}/criteria",
            put(workflows::handle_set_criteria),
        )
        .route("/api/workflows/{id}/records", get(workflows::handle_records))
        .route("/api/workflows/{id}/capsule", post(workflows::handle_capsule))
        .route("/api/workflows/{id}/anchor", post(workflows::handle_anchor))
        .route("/api/workflows/{id}/verify", post(workflows::handle_verify))
        .route("/api/workflows/{id}/reset", post(workflows::handle_reset))
        .route(
            "/api/dataset-anchor",
            post(mock::handle_create_dataset_anchor),
        )
        .route(
            "/api/dataset-anchor/{id}",
            get(mock::handle_get_dataset_anchor),
        )
        .route("/api/provenance", post(mock::handle_create_provenance))
        .route("/api/provenance/{id}", get(mock::handle_get_provenance))
        .route("/api/inference", post(mock::handle_inference))
        .route("/api/verify", post(mock::handle_verify))
        .route(
            "/api/reports",
            post(mock::handle_create_report).get(mock::handle_list_reports),
        )
        .route("/api/contact", post(contact::handle_contact))
        .route("/health", get(handlers::handle_health))
        .fallback(handlers::handle_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(CatchPanicLayer::custom(panic_response));

    let api = if state.config.server.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any);
        api.layer(cors)
    } else {
        api
    };

    api.with_state(state)
}

/// Render a handler panic as the structured 500 body.
fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|msg| msg.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    ApiError::Internal(detail).into_response()
}

/// Bind to the configured address and serve until Ctrl+C.
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let bind = state.config.server.bind.clone();
    let app = router(state);

    let listener = TcpListener::bind(&bind).await?;
    info!("insight server listening (addr={})", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(err) => {
            warn!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    }
}
