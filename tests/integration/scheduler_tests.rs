use chrono::{Duration as ChronoDuration, Utc};
use listing_hunter::plugins::notifiers::DiscordNotifier;
use listing_hunter::{FilterConfigStore, MonitorHealth, MonitorLoop, Notifier, TickOutcome};
use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

async fn mount_webhook(server: &MockServer, status: u16, expected_posts: u64) {
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_posts)
        .mount(server)
        .await;
}

fn build_loop(config: &AppConfig, seen_path: &std::path::Path) -> MonitorLoop<WebScraper> {
    let shutdown = CancellationToken::new();
    let pipeline = build_pipeline(config, empty_seen(seen_path), shutdown.clone());
    let notifier = DiscordNotifier::from_config(&config.notifications.discord)
        .unwrap()
        .map(|discord| Arc::new(discord) as Arc<dyn Notifier>);

    MonitorLoop::new(
        pipeline,
        FilterConfigStore::new(config.filter.clone()),
        notifier,
        Arc::new(MonitorHealth::new(Utc::now(), 8, 60)),
        config.scheduler.clone(),
        shutdown,
    )
}

#[tokio::test]
async fn test_tick_delivers_offers_and_persists() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;
    mount_webhook(&server, 204, 2).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);
    let monitor = build_loop(&config, &seen_path);

    let outcome = monitor.tick(Utc::now()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Completed { found: 2 });

    let saved: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&seen_path).unwrap()).unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.windows(2).all(|pair| pair[0] <= pair[1]));

    // Same pages again: nothing new, nothing posted.
    let outcome = monitor.tick(Utc::now() + ChronoDuration::minutes(5)).await.unwrap();
    assert_eq!(outcome, TickOutcome::Completed { found: 0 });
    assert_eq!(monitor.health().snapshot().await.consecutive_zero_runs, 1);
}

#[tokio::test]
async fn test_webhook_failures_do_not_abort_scan() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;
    mount_webhook(&server, 500, 2).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let config = get_test_config(&server, &seen_path);
    let monitor = build_loop(&config, &seen_path);

    let outcome = monitor.tick(Utc::now()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Completed { found: 2 });

    let state = monitor.health().snapshot().await;
    assert_eq!(state.notify_failures, 2);
    assert!(seen_path.exists());
}

#[tokio::test]
async fn test_missing_webhook_keeps_loop_idle() {
    let server = MockServer::start().await;
    mount_listing(&server, default_first_page(), Some(default_second_page())).await;

    let dir = tempdir().unwrap();
    let seen_path = dir.path().join("seen_ads.json");
    let mut config = get_test_config(&server, &seen_path);
    config.notifications.discord.webhook_url = None;
    let monitor = build_loop(&config, &seen_path);

    assert_eq!(monitor.tick(Utc::now()).await.unwrap(), TickOutcome::Idle);
    assert!(server.received_requests().await.unwrap().is_empty());
}
