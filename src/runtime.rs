use crate::{
    auth::api_key_auth,
    engine::{Engine, GenerateResponse, PipelineStatus, RawRequest},
    safety::check_safety,
};

use axum::debug_handler;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;

/* ---------------- server ---------------- */

pub fn router(engine: Arc<Engine>) -> Router {
    let protected = Router::new()
        .route("/generate", post(generate))
        .route("/check", post(check_code))
        .layer(middleware::from_fn(api_key_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(engine)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "request completed"
                    );
                }),
        )
}

pub async fn serve(addr: &str, engine: Arc<Engine>) -> anyhow::Result<()> {
    let socket: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(socket).await?;

    tracing::info!(
        execution_enabled = engine.policy().enabled,
        "scriptgen listening on http://{}",
        socket
    );

    axum::serve(listener, router(engine)).await?;
    Ok(())
}

/* ---------------- request models ---------------- */

#[derive(Debug, Deserialize)]
struct CheckRequest {
    code: String,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    safe: bool,
    safety_issues: Vec<String>,
}

/* ---------------- endpoints ---------------- */

async fn health() -> &'static str {
    "ok"
}

#[debug_handler]
async fn generate(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<RawRequest>,
) -> impl IntoResponse {
    let resp = engine.run_generation(req).await;
    (http_status(&resp), Json(resp))
}

#[debug_handler]
async fn check_code(Json(req): Json<CheckRequest>) -> impl IntoResponse {
    let safety_issues = check_safety(&req.code);
    Json(CheckResponse {
        safe: safety_issues.is_empty(),
        safety_issues,
    })
}

/// Generation failures map to 502 and bad requests to 400. Everything else,
/// including safety blocks and skipped execution, is a successful exchange.
fn http_status(resp: &GenerateResponse) -> StatusCode {
    match resp.status {
        PipelineStatus::ValidationFailed => StatusCode::BAD_REQUEST,
        PipelineStatus::GenerationFailed => StatusCode::BAD_GATEWAY,
        PipelineStatus::Generated
        | PipelineStatus::Executed
        | PipelineStatus::ExecutionSkipped
        | PipelineStatus::SafetyBlocked => StatusCode::OK,
    }
}
