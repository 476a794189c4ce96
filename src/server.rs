//! HTTP server for ticket triage

use axum::{
    extract::{ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::rate_limit::{RateLimitDecision, RateLimiter};
use crate::triage_engine::{SharedTriageEngine, TriageError};
use crate::types::TriageResult;

pub const MAX_DESCRIPTION_CHARS: usize = 4000;

/// HTTP request body
#[derive(Debug, Deserialize)]
pub struct TriageRequestHttp {
    pub description: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub classifier: String,
    pub search_strategy: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedTriageEngine,
    pub limiter: Arc<RateLimiter>,
    pub request_timeout: Duration,
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}

/// Triage handler
async fn triage_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<TriageRequestHttp>,
) -> Result<Json<TriageResult>, Response> {
    let client = peer
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if let RateLimitDecision::Limited { retry_after } = state.limiter.try_acquire(&client) {
        let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
        warn!("Rate limit exceeded for {} (retry after {}s)", client, secs);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, secs.to_string())],
            Json(ErrorResponse {
                error: "Rate limit exceeded".to_string(),
                details: Some(format!("Retry after {} seconds", secs)),
            }),
        )
            .into_response());
    }

    let length = req.description.chars().count();
    if length == 0 || length > MAX_DESCRIPTION_CHARS {
        warn!("Rejected description of {} characters from {}", length, client);
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid description",
            Some(format!("Description must be 1-{} characters.", MAX_DESCRIPTION_CHARS)),
        ));
    }

    let description = req.description.trim();
    if description.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Description must not be empty.",
            None,
        ));
    }

    info!("Received triage request from {}: {} characters", client, description.chars().count());

    match tokio::time::timeout(state.request_timeout, state.engine.triage(description)).await {
        Ok(Ok(result)) => Ok(Json(result)),
        Ok(Err(TriageError::EmptyDescription)) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "Description must not be empty.",
            None,
        )),
        Ok(Err(e @ TriageError::Search(_))) => {
            error!("Triage failed: {}", e);
            Err(error_response(
                StatusCode::BAD_GATEWAY,
                "Triage failed",
                Some(e.to_string()),
            ))
        }
        Err(_) => {
            error!("Triage timed out after {:?}", state.request_timeout);
            Err(error_response(
                StatusCode::GATEWAY_TIMEOUT,
                "Triage timed out",
                Some(format!("No result within {:?}", state.request_timeout)),
            ))
        }
    }
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "ticket-triage".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier: state.engine.classifier_name().to_string(),
        search_strategy: state.engine.search_strategy().to_string(),
    })
}

/// Create and configure the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/triage", post(triage_handler))
        .with_state(state)
}

/// Serve on an already-bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Run the HTTP server
pub async fn run_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting ticket triage server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    serve(listener, state).await
}
