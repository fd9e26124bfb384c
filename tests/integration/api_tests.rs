use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Utc;
use listing_hunter::web::{create_router, AppState};
use listing_hunter::{FilterConfigStore, MonitorHealth, PriceCatalog};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::MockServer;

use super::*;

#[tokio::test]
async fn test_config_edit_applies_to_next_scan() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);
    let seen = empty_seen(&seen_path);
    let filters = FilterConfigStore::new(config.filter.clone());

    let app = create_router(AppState {
        filters: filters.clone(),
        catalog: Arc::new(PriceCatalog::default()),
        health: Arc::new(MonitorHealth::new(Utc::now(), 8, 60)),
        seen: seen.clone(),
        notifier_configured: true,
        started_at: Utc::now(),
    });

    let update = json!({
        "active_models": ["13 pro max"],
        "required_keywords": [],
        "blocked_keywords": [],
        "include_damaged": false,
        "ignore_age_limit": true,
        "max_ad_age_hours": 12,
        "max_pages": 1,
        "active": true
    });
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/v1/config")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(update.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let pipeline = build_pipeline(&config, seen, CancellationToken::new());
    let snapshot = filters.snapshot().await;
    let report = pipeline.run_once(snapshot.as_ref(), Utc::now()).await.unwrap();

    let models: Vec<_> = report.offers.iter().filter_map(|o| o.model.as_deref()).collect();
    assert_eq!(models, vec!["13 Pro Max"]);
    assert_eq!(report.pages_fetched, 1);
}
