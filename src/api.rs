// src/api.rs
//! Thin HTTP shell: one aggregation per `GET /api/news`.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ingest::config::AggregatorConfig;
use crate::ingest::registry::SourceRegistry;
use crate::ingest::Aggregator;
use crate::news::NewsResponse;

/// Shared-cache directive for successful responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age_secs: u64,
    pub stale_while_revalidate_secs: u64,
}

impl CachePolicy {
    pub fn header_value(&self) -> String {
        format!(
            "public, s-maxage={}, stale-while-revalidate={}",
            self.max_age_secs, self.stale_while_revalidate_secs
        )
    }
}

impl From<&AggregatorConfig> for CachePolicy {
    fn from(cfg: &AggregatorConfig) -> Self {
        Self {
            max_age_secs: cfg.cache_max_age_secs,
            stale_while_revalidate_secs: cfg.cache_swr_secs,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub cache: CachePolicy,
}

impl AppState {
    pub fn new(aggregator: Aggregator, cache: CachePolicy) -> Self {
        Self { aggregator, cache }
    }

    /// Registry from config files (or built-ins), knobs from env.
    pub fn from_env() -> Result<Self> {
        let cfg = AggregatorConfig::from_env();
        let sources = SourceRegistry::resolve()?.into_sources();
        tracing::info!(
            sources = sources.len(),
            timeout_secs = cfg.fetch_timeout.as_secs(),
            max_items = cfg.max_items_per_source,
            "news aggregator configured"
        );
        let aggregator = Aggregator::from_config(sources, &cfg)?;
        Ok(Self::new(aggregator, CachePolicy::from(&cfg)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(get_news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn get_news(State(state): State<AppState>) -> Response {
    match state.aggregator.aggregate().await {
        Ok(news) => (
            [(header::CACHE_CONTROL, state.cache.header_value())],
            Json(NewsResponse::ok(news)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "news aggregation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CACHE_CONTROL, "no-store".to_string())],
                Json(NewsResponse::failed()),
            )
                .into_response()
        }
    }
}
