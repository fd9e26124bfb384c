use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::catalog::CatalogEntry;
use crate::models::FilterConfig;
use crate::monitor::MonitorState;

use super::{ApiResponse, AppState, HealthCheck, HealthResponse, WebError};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active: bool,
    pub notifier_configured: bool,
    pub seen_count: usize,
    pub active_model_count: usize,
    pub catalog_size: usize,
    pub max_pages: u32,
    pub max_ad_age_hours: u32,
    pub monitor: MonitorState,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let monitor = state.health.snapshot().await;

    let scheduler = match &monitor.last_error {
        Some(error) => HealthCheck::degraded("scheduler", format!("Last scan failed: {}", error)),
        None => HealthCheck::healthy("scheduler", format!("{} scans completed", monitor.total_scans)),
    };
    let notifier = if state.notifier_configured {
        HealthCheck::healthy("notifier", "Discord webhook configured")
    } else {
        HealthCheck::degraded("notifier", "No webhook configured, scans are paused")
    };

    Json(HealthResponse::from_checks(state.started_at, vec![scheduler, notifier]))
}

pub async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<FilterConfig>> {
    let config = state.filters.snapshot().await;
    Json(ApiResponse::success(config.as_ref().clone()))
}

pub async fn update_config(
    State(state): State<AppState>,
    Json(mut request): Json<FilterConfig>,
) -> Result<Json<ApiResponse<FilterConfig>>, WebError> {
    if let Err(errors) = request.validate() {
        return Err(WebError::unprocessable(
            "Invalid filter configuration",
            json!({ "fields": errors.to_string() }),
        ));
    }

    if let Err(unknown) = request.canonicalize_models(&state.catalog) {
        return Err(WebError::unprocessable(
            "Unknown models in active_models",
            json!({ "unknown_models": unknown }),
        ));
    }

    let previous = state.filters.replace(request).await;
    let current = state.filters.snapshot().await;

    tracing::info!(
        active = current.active,
        active_models = current.active_models.len(),
        max_pages = current.max_pages,
        previously_active = previous.active,
        "Filter configuration replaced"
    );

    Ok(Json(ApiResponse::success(current.as_ref().clone())))
}

pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let config = state.filters.snapshot().await;

    let status = StatusResponse {
        active: config.active,
        notifier_configured: state.notifier_configured,
        seen_count: state.seen.len().await,
        active_model_count: config.active_models.len(),
        catalog_size: state.catalog.len(),
        max_pages: config.page_count(),
        max_ad_age_hours: config.max_ad_age_hours,
        monitor: state.health.snapshot().await,
    };

    Json(ApiResponse::success(status))
}

pub async fn list_catalog(State(state): State<AppState>) -> Json<ApiResponse<Vec<CatalogEntry>>> {
    Json(ApiResponse::success_with_meta(
        state.catalog.entries(),
        json!({ "family": state.catalog.family(), "total": state.catalog.len() }),
    ))
}

pub async fn get_catalog_entry(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<Json<ApiResponse<CatalogEntry>>, WebError> {
    let key = state
        .catalog
        .canonical_key(&model)
        .ok_or_else(|| WebError::not_found(format!("Model '{}'", model)))?;
    let band = state
        .catalog
        .band(key)
        .ok_or_else(|| WebError::internal("Catalog key without a price band"))?;

    Ok(Json(ApiResponse::success(CatalogEntry {
        key: key.to_string(),
        band,
    })))
}
