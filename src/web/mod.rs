use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::catalog::PriceCatalog;
use crate::models::FilterConfigStore;
use crate::monitor::MonitorHealth;
use crate::seen_store::SeenStore;

pub mod handlers;
pub mod responses;

pub use handlers::{get_catalog_entry, get_config, get_status, health_check, list_catalog, update_config};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub filters: FilterConfigStore,
    pub catalog: Arc<PriceCatalog>,
    pub health: Arc<MonitorHealth>,
    pub seen: Arc<SeenStore>,
    pub notifier_configured: bool,
    pub started_at: DateTime<Utc>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config).put(update_config))
        .route("/status", get(get_status))
        .route("/catalog", get(list_catalog))
        .route("/catalog/:model", get(get_catalog_entry))
}
