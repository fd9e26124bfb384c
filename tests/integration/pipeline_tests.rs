use chrono::Utc;
use listing_hunter::SeenStore;
use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

use super::*;

#[tokio::test]
async fn test_scan_over_live_pages() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);
    let pipeline = build_pipeline(&config, empty_seen(&seen_path), CancellationToken::new());

    let report = pipeline.run_once(&config.filter, Utc::now()).await.unwrap();

    let found: Vec<(&str, Option<&str>)> = report
        .offers
        .iter()
        .map(|o| (o.title(), o.model.as_deref()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("iPhone 11 64GB czarny", Some("11")),
            ("iPhone 13 Pro 256GB grafitowy", Some("13 Pro")),
        ]
    );

    let first = &report.offers[0];
    assert_eq!(
        first.identifier(),
        format!("{}/d/oferta/iphone-11-64gb-CID99-IDa1.html", server.uri())
    );
    assert_eq!(first.raw.image_url, format!("{}/img/iphone-11-64gb-CID99-IDa1.jpg", server.uri()));
    assert_eq!(first.raw.location, "Warszawa");

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.candidates, 6);
    assert_eq!(report.skipped["blocked_keyword"], 1);
    assert_eq!(report.skipped["model_inactive"], 1);
    assert_eq!(report.skipped["too_old"], 1);
    assert_eq!(report.skipped["price_out_of_band"], 1);
}

#[tokio::test]
async fn test_failing_page_is_isolated() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), None).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);
    let pipeline = build_pipeline(&config, empty_seen(&seen_path), CancellationToken::new());

    let report = pipeline.run_once(&config.filter, Utc::now()).await.unwrap();
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.offers.len(), 1);
}

#[tokio::test]
async fn test_seen_set_survives_restart() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("data").join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);

    let seen = empty_seen(&seen_path);
    let pipeline = build_pipeline(&config, seen.clone(), CancellationToken::new());
    let first = pipeline.run_once(&config.filter, Utc::now()).await.unwrap();
    assert_eq!(first.offers.len(), 2);
    seen.save().await.unwrap();

    // A fresh process reloads the set from disk and finds nothing new.
    let reloaded = Arc::new(SeenStore::open(&seen_path).await);
    assert_eq!(reloaded.len().await, 2);
    let pipeline = build_pipeline(&config, reloaded, CancellationToken::new());
    let second = pipeline.run_once(&config.filter, Utc::now()).await.unwrap();
    assert!(second.offers.is_empty());
    assert_eq!(second.skipped["already_seen"], 2);
}

#[tokio::test]
async fn test_damaged_offers_pass_when_included() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);
    let pipeline = build_pipeline(&config, empty_seen(&seen_path), CancellationToken::new());

    let mut filter = config.filter.clone();
    filter.include_damaged = true;
    filter.max_pages = 1;

    let report = pipeline.run_once(&filter, Utc::now()).await.unwrap();
    let titles: Vec<&str> = report.offers.iter().map(|o| o.title()).collect();
    assert_eq!(titles, vec!["iPhone 11 64GB czarny", "iPhone 11 uszkodzony"]);
}
