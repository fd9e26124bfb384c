// Shared fixtures for the end-to-end tests: a fake listing site and webhook
// served by wiremock, plus config and component builders pointing at them.

pub mod api_tests;
pub mod pipeline_tests;
pub mod scheduler_tests;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use listing_hunter::config::{
    DiscordConfig, LoggingConfig, MetricsConfig, NotificationsConfig, SchedulerConfig, ScraperConfig,
    ServerConfig, StorageConfig,
};
use listing_hunter::{
    AppConfig, FilterConfig, ListingExtractor, Pipeline, PriceCatalog, SeenStore, WebScraper,
};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LISTING_PATH: &str = "/elektronika/telefony/q-iphone/";
pub const WEBHOOK_PATH: &str = "/api/webhooks/42/token";

pub fn get_test_config(server: &MockServer, seen_path: &Path) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        scraper: ScraperConfig {
            base_url: format!("{}{}", server.uri(), LISTING_PATH),
            offer_path_pattern: "^/d/oferta/".to_string(),
            user_agent: "ListingHunter-Test/1.0".to_string(),
            request_timeout: 5,
            page_delay_ms: 0,
            time_zone: chrono_tz::Europe::Warsaw,
        },
        scheduler: SchedulerConfig {
            min_interval_secs: 120,
            max_interval_secs: 420,
            idle_interval_secs: 60,
            error_backoff_secs: 60,
            silence_alert_hours: 8,
            heartbeat_interval_minutes: 60,
        },
        storage: StorageConfig {
            seen_ads_path: seen_path.to_path_buf(),
        },
        notifications: NotificationsConfig {
            discord: DiscordConfig {
                webhook_url: Some(format!("{}{}", server.uri(), WEBHOOK_PATH)),
                username: "Hunter Test Bot".to_string(),
                avatar_url: None,
                request_timeout: 5,
            },
        },
        filter: test_filter(&["11", "13 Pro"], 2),
        metrics: MetricsConfig {
            enabled: false,
            port: 9001,
        },
        logging: LoggingConfig::default(),
    }
}

pub fn test_filter(models: &[&str], max_pages: u32) -> FilterConfig {
    FilterConfig {
        active_models: models.iter().map(|m| m.to_string()).collect(),
        required_keywords: vec![],
        blocked_keywords: vec!["uszkodzony".to_string(), "blokada".to_string()],
        include_damaged: false,
        ignore_age_limit: false,
        max_ad_age_hours: 12,
        max_pages,
        active: true,
    }
}

pub fn build_pipeline(config: &AppConfig, seen: Arc<SeenStore>, shutdown: CancellationToken) -> Pipeline<WebScraper> {
    Pipeline::new(
        WebScraper::new(&config.scraper).unwrap(),
        ListingExtractor::new(&config.scraper.offer_path_pattern).unwrap(),
        PriceCatalog::default(),
        seen,
        Url::parse(&config.scraper.base_url).unwrap(),
        Duration::from_millis(config.scraper.page_delay_ms),
        shutdown,
    )
    .with_time_zone(config.scraper.time_zone)
}

pub fn empty_seen(path: &Path) -> Arc<SeenStore> {
    Arc::new(SeenStore::with_ids(path, HashSet::new()))
}

pub fn offer_card(slug: &str, title: &str, price: &str, posted: &str) -> String {
    format!(
        r#"<div data-cy="l-card">
             <a href="/d/oferta/{slug}.html?reason=observed_search"><img src="/img/{slug}.jpg" alt="{title}"></a>
             <div>
               <a href="/d/oferta/{slug}.html"><h6>{title}</h6></a>
               <p data-testid="ad-price">{price}</p>
             </div>
             <p data-testid="location-date">Warszawa - {posted}</p>
           </div>"#
    )
}

pub fn listing_page(cards: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>iPhone - OLX</title></head>
           <body><nav><a href="/elektronika/">Elektronika</a></nav>
           <div data-testid="listing-grid">{}</div></body></html>"#,
        cards.join("\n")
    )
}

/// Page 1 gets `first`; `?page=2` gets `second`, or a 500 when `None`.
pub async fn mount_listing(server: &MockServer, first: String, second: Option<String>) {
    let second_response = match second {
        Some(body) => ResponseTemplate::new(200).set_body_string(body),
        None => ResponseTemplate::new(500),
    };

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(second_response)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(first))
        .mount(server)
        .await;
}

pub fn default_first_page() -> String {
    listing_page(&[
        offer_card("iphone-11-64gb-CID99-IDa1", "iPhone 11 64GB czarny", "320 zł", "30 minut temu"),
        offer_card("iphone-11-uszkodzony-CID99-IDa2", "iPhone 11 uszkodzony", "210 zł", "1 godzinę temu"),
        offer_card("iphone-13-pro-max-CID99-IDa3", "iPhone 13 Pro Max", "1 200 zł", "2 godziny temu"),
        offer_card("iphone-13-pro-old-CID99-IDa4", "iPhone 13 Pro 128GB", "1 100 zł", "2 dni temu"),
    ])
}

pub fn default_second_page() -> String {
    listing_page(&[
        offer_card("iphone-13-pro-CID99-IDb1", "iPhone 13 Pro 256GB grafitowy", "1 350 zł", "3 godziny temu"),
        offer_card("iphone-13-pro-drogi-CID99-IDb2", "iPhone 13 Pro", "3 000 zł", "3 godziny temu"),
    ])
}
