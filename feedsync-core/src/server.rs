use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{credential_presence, CredentialPresence};
use crate::manifest::StoreDiagnostics;
use crate::sync::SyncEngine;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address {addr}: {source}")]
    Bind {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct ServerState {
    engine: Arc<SyncEngine>,
}

/// On-demand trigger plus read-only and diagnostic endpoints, all driving
/// the same engine as the scheduler.
pub fn build_router(engine: Arc<SyncEngine>) -> Router {
    let state = ServerState { engine };
    Router::new()
        .route("/fetch", get(run_fetch))
        .route("/videos.json", get(published_manifest))
        .route("/debug", get(credential_debug))
        .route("/check-store", get(store_check))
        .fallback(liveness)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(engine: Arc<SyncEngine>, bind: &str) -> Result<(), ServerError> {
    let addr: SocketAddr = bind.parse().map_err(|source| ServerError::Bind {
        addr: bind.to_string(),
        source,
    })?;
    let app = build_router(engine);
    tracing::info!(target: "server", %addr, "starting trigger surface");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_fetch(State(state): State<ServerState>) -> Response {
    match state.engine.run_cycle().await {
        Ok(report) => Json(report.urls).into_response(),
        Err(err) => {
            tracing::error!(target: "server", error = %err, "on-demand cycle failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("sync cycle failed: {err}"),
            )
                .into_response()
        }
    }
}

async fn published_manifest(State(state): State<ServerState>) -> Response {
    match state.engine.fetch_published().await {
        Ok(urls) => Json(urls).into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            format!("published manifest unavailable: {err}"),
        )
            .into_response(),
    }
}

async fn credential_debug() -> Json<CredentialPresence> {
    Json(credential_presence())
}

async fn store_check(State(state): State<ServerState>) -> Json<StoreDiagnostics> {
    Json(state.engine.store_diagnostics().await)
}

async fn liveness() -> &'static str {
    "feedsync worker alive\n"
}
