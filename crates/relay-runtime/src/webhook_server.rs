//! Cloud API webhook router and server loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use relay_whatsapp::parse_inbound_messages;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::dispatch::RelayRuntime;

pub const WEBHOOK_ENDPOINT: &str = "/webhook";
pub const HEALTH_ENDPOINT: &str = "/healthz";
const SERVICE_INFO: &str = concat!("WhatsApp dialog relay v", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct WebhookState {
    runtime: RelayRuntime,
    verify_token: Option<String>,
}

impl WebhookState {
    pub fn new(runtime: RelayRuntime, config: &RelayConfig) -> Self {
        Self {
            runtime,
            verify_token: config.verify_token().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    hub_mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    hub_verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    hub_challenge: Option<String>,
}

pub fn build_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", get(handle_service_info))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(
            WEBHOOK_ENDPOINT,
            get(handle_webhook_verify).post(handle_webhook),
        )
        .with_state(state)
}

/// Binds the configured address and serves until ctrl-c.
pub async fn serve_webhooks(config: &RelayConfig, state: Arc<WebhookState>) -> Result<()> {
    let bind_addr = config.bind_addr()?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    tracing::info!(addr = %local_addr, "webhook is listening");

    axum::serve(listener, build_webhook_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("webhook server exited unexpectedly")
}

async fn handle_service_info() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "info": SERVICE_INFO,
        "status": "healthy",
        "error": null,
    }))
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn handle_webhook_verify(
    State(state): State<Arc<WebhookState>>,
    Query(query): Query<WebhookVerifyQuery>,
) -> Response {
    let observed = query
        .hub_verify_token
        .as_deref()
        .map(str::trim)
        .unwrap_or("");
    let verified = query.hub_mode.as_deref() == Some("subscribe")
        && state
            .verify_token
            .as_deref()
            .is_some_and(|expected| expected == observed);
    if verified {
        tracing::info!("webhook verified");
        return (StatusCode::OK, query.hub_challenge.unwrap_or_default()).into_response();
    }
    tracing::warn!("webhook verification rejected");
    (StatusCode::FORBIDDEN, "Forbidden").into_response()
}

async fn handle_webhook(State(state): State<Arc<WebhookState>>, body: String) -> Response {
    let payload = match serde_json::from_str::<Value>(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::debug!(error = %error, "ignoring unparseable webhook body");
            return (StatusCode::OK, "ok").into_response();
        }
    };

    for message in parse_inbound_messages(&payload) {
        if let Err(error) = state.runtime.handle_inbound(&message).await {
            tracing::error!(
                user_id = %message.from,
                kind = message.content.kind(),
                error = %format!("{error:#}"),
                "dialog turn failed"
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response();
        }
    }
    (StatusCode::OK, "ok").into_response()
}
