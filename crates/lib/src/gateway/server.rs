//! Webhook HTTP server: verifies LINE signatures, fans events out to the
//! router, and acknowledges the delivery as a whole.

use crate::channels::{verify_signature, LineClient, WebhookDelivery};
use crate::config::{self, Config, LineCredentials};
use crate::llm::{OpenAiClient, SamplingConfig};
use crate::router::{LocalClock, Router, RouterRules};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router as AxumRouter,
};
use futures_util::future::join_all;
use serde_json::json;
use std::sync::Arc;

/// Shared state for the webhook server (config, router, channel secret).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub router: Arc<Router>,
    /// Channel secret used to verify X-Line-Signature on each delivery.
    pub channel_secret: Arc<String>,
}

/// Build the axum application: health probe plus the webhook endpoint.
pub fn build_app(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/", get(health_http))
        .route("/webhook", post(line_webhook))
        .with_state(state)
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.server.port,
    }))
}

/// POST /webhook — one LINE delivery (a batch of events).
///
/// Events are processed concurrently; the delivery is acknowledged only after
/// every event has finished. Any event failure turns the whole delivery into
/// a 500 with an empty body — no partial-success reporting.
async fn line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let provided = headers
        .get("x-line-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !verify_signature(&state.channel_secret, &body, provided) {
        log::warn!("webhook: signature verification failed");
        return StatusCode::FORBIDDEN;
    }

    let delivery: WebhookDelivery = match serde_json::from_slice(&body) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("webhook: malformed delivery body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let delivery_id = uuid::Uuid::new_v4();
    log::debug!(
        "webhook delivery {}: {} event(s)",
        delivery_id,
        delivery.events.len()
    );

    let results = join_all(
        delivery
            .events
            .iter()
            .map(|event| state.router.handle_event(event)),
    )
    .await;

    let mut failed = 0usize;
    for result in results {
        if let Err(e) = result {
            log::error!("webhook delivery {}: event failed: {}", delivery_id, e);
            failed += 1;
        }
    }
    if failed > 0 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

/// Run the webhook server; binds to config.server.bind:config.server.port.
/// Fails fast when the LINE credentials are missing. Blocks until shutdown
/// (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let credentials = LineCredentials::resolve(&config)?;
    log::info!(
        "LINE token loaded, prefix: {}…",
        credentials
            .channel_access_token
            .chars()
            .take(10)
            .collect::<String>()
    );

    let api_key = match config::resolve_openai_api_key(&config) {
        Some(k) => k,
        None => {
            log::warn!("OPENAI_API_KEY is not set; fallback replies will fail per delivery");
            String::new()
        }
    };

    let rules = RouterRules::from_config(&config.routing)?;
    let clock = LocalClock::new(config.routing.utc_offset_hours)?;
    let sampling = SamplingConfig {
        temperature: config.openai.temperature,
        max_tokens: config.openai.max_tokens,
    };
    let router = Router::new(
        rules,
        config.openai.model.clone(),
        sampling,
        Arc::new(LineClient::new(credentials.channel_access_token, None)),
        Arc::new(OpenAiClient::new(api_key, None)),
        Arc::new(clock),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        router: Arc::new(router),
        channel_secret: Arc::new(credentials.channel_secret),
    };
    let app = build_app(state);

    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("liftbot listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;
    log::info!("liftbot stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}
