//! HTTP API
//!
//! - `GET /api/sentiment/{coin}` composite sentiment per day
//! - `GET /api/price/{coin}` USD price per day
//! - `GET /api/gauge/{coin}` composite for one day as a gauge
//! - `GET /widgets/*` static front-end files
//! - `GET /health` liveness

mod routes;

#[cfg(test)]
mod tests;

pub use routes::{parse_coin, parse_metrics, ApiError};

use crate::config::{Config, DefaultsConfig};
use crate::manager::SentimentManager;
use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SentimentManager>,
    pub defaults: DefaultsConfig,
}

impl AppState {
    pub fn new(manager: SentimentManager, defaults: DefaultsConfig) -> Self {
        Self {
            manager: Arc::new(manager),
            defaults,
        }
    }
}

async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn router(state: AppState, widgets_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(liveness))
        .route("/api/sentiment/:coin", get(routes::sentiment))
        .route("/api/price/:coin", get(routes::price))
        .route("/api/gauge/:coin", get(routes::gauge))
        .nest_service("/widgets", ServeDir::new(widgets_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &Config, manager: SentimentManager) -> anyhow::Result<()> {
    let ttl = config.sources.cache_ttl_secs.max(1) as u64;
    manager.registry().start_cache_cleanup(Duration::from_secs(ttl));

    let state = AppState::new(manager, config.defaults.clone());
    let app = router(state, &config.server.widgets_dir);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("sentiment-index v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    axum::serve(listener, app).await?;
    Ok(())
}
