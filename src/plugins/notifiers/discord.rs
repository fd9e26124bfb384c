use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

use crate::config::DiscordConfig;
use crate::models::ClassifiedOffer;
use crate::plugins::traits::{HeartbeatStats, NotificationResult, Notifier};
use crate::utils::error::{AppError, Result};

const CHANNEL: &str = "discord";
const MAX_TITLE_CHARS: usize = 200;
const FOOTER: &str = "Listing Hunter";

const COLOR_OFFER: u32 = 0x00ff00;
const COLOR_ALERT: u32 = 0xff9900;
const COLOR_STATUS: u32 = 0x0099ff;

pub struct DiscordNotifier {
    client: Client,
    webhook_url: Url,
    username: String,
    avatar_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig, webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            webhook_url,
            username: config.username.clone(),
            avatar_url: config.avatar_url.clone(),
        })
    }

    /// Builds a notifier when a webhook is configured, `None` otherwise.
    pub fn from_config(config: &DiscordConfig) -> Result<Option<Self>> {
        match config.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(Some(Self::new(config, Url::parse(url)?)?)),
            _ => Ok(None),
        }
    }

    fn create_offer_embed(&self, offer: &ClassifiedOffer) -> serde_json::Value {
        let title: String = offer.title().chars().take(MAX_TITLE_CHARS).collect();
        let model = offer.model.as_deref().unwrap_or("?");
        let posted = if offer.raw.time_text.is_empty() {
            "n/a".to_string()
        } else {
            offer.raw.time_text.clone()
        };

        let mut fields = vec![
            json!({"name": "💰 Price", "value": format!("**{}**", offer.formatted_price()), "inline": true}),
            json!({"name": "📱 Model", "value": model, "inline": true}),
            json!({"name": "🕒 Posted", "value": posted, "inline": true}),
        ];

        if !offer.raw.location.is_empty() {
            fields.push(json!({"name": "📍 Location", "value": offer.raw.location, "inline": true}));
        }

        if let Some(band) = &offer.price_band {
            fields.push(json!({
                "name": "🎯 Price band",
                "value": format!("{}-{} zł", band.min.normalize(), band.max.normalize()),
                "inline": true
            }));
        }

        let mut embed = json!({
            "title": format!("📱 {}", title),
            "url": offer.identifier(),
            "color": COLOR_OFFER,
            "timestamp": Utc::now().to_rfc3339(),
            "fields": fields,
            "footer": { "text": FOOTER }
        });

        if !offer.raw.image_url.is_empty() {
            embed["thumbnail"] = json!({ "url": offer.raw.image_url });
        }

        embed
    }

    fn create_alert_embed(&self, message: &str) -> serde_json::Value {
        json!({
            "title": "⚠️ No new offers",
            "description": message,
            "color": COLOR_ALERT,
            "timestamp": Utc::now().to_rfc3339(),
            "footer": { "text": FOOTER }
        })
    }

    fn create_status_embed(&self, stats: &HeartbeatStats) -> serde_json::Value {
        json!({
            "title": "📊 Monitor status",
            "color": COLOR_STATUS,
            "timestamp": Utc::now().to_rfc3339(),
            "fields": [
                {"name": "🕒 Last find", "value": format_last_found(stats.last_found), "inline": true},
                {
                    "name": "📱 Active models",
                    "value": format!("{}/{}", stats.active_model_count, stats.catalog_size),
                    "inline": true
                },
                {"name": "👀 Seen offers", "value": stats.seen_count.to_string(), "inline": true}
            ],
            "footer": { "text": FOOTER }
        })
    }

    fn create_webhook_payload(&self, embed: serde_json::Value) -> serde_json::Value {
        let mut payload = json!({
            "username": self.username,
            "embeds": [embed]
        });

        if let Some(avatar_url) = &self.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }

    async fn post(&self, embed: serde_json::Value) -> Result<NotificationResult> {
        let payload = self.create_webhook_payload(embed);

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::notify_failed(CHANNEL, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::notify_failed(
                CHANNEL,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        Ok(NotificationResult::delivered(None))
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, offer: &ClassifiedOffer) -> Result<NotificationResult> {
        let result = self.post(self.create_offer_embed(offer)).await?;
        tracing::info!(
            model = offer.model.as_deref().unwrap_or("?"),
            price = %offer.formatted_price(),
            "Sent offer to Discord"
        );
        Ok(result)
    }

    async fn alert(&self, message: &str) -> Result<NotificationResult> {
        self.post(self.create_alert_embed(message)).await
    }

    async fn heartbeat(&self, stats: &HeartbeatStats) -> Result<NotificationResult> {
        self.post(self.create_status_embed(stats)).await
    }
}

fn format_last_found(last_found: DateTime<Utc>) -> String {
    last_found.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PriceBand;
    use crate::models::RawCandidate;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> DiscordConfig {
        DiscordConfig {
            webhook_url: None,
            username: "Price Bot".to_string(),
            avatar_url: Some("https://example.com/avatar.png".to_string()),
            request_timeout: 2,
        }
    }

    fn create_test_offer() -> ClassifiedOffer {
        ClassifiedOffer {
            raw: RawCandidate {
                identifier: "https://www.olx.pl/d/oferta/iphone-13-pro-CID99-IDabc.html".to_string(),
                title: "iPhone 13 Pro 128GB Stan idealny".to_string(),
                price_text: "1 900 zł".to_string(),
                time_text: "Gdańsk - Dzisiaj o 10:15".to_string(),
                image_url: "https://img.example.com/abc.jpg".to_string(),
                location: "Gdańsk".to_string(),
            },
            model: Some("13 Pro".to_string()),
            price: Some(Decimal::from(1900)),
            posted_at: None,
            price_band: Some(PriceBand::new(1700, 2100)),
        }
    }

    fn notifier_for(server: &MockServer) -> DiscordNotifier {
        let url = Url::parse(&format!("{}/api/webhooks/1/token", server.uri())).unwrap();
        DiscordNotifier::new(&create_test_config(), url).unwrap()
    }

    #[test]
    fn test_from_config_without_webhook_is_none() {
        assert!(DiscordNotifier::from_config(&create_test_config()).unwrap().is_none());

        let mut config = create_test_config();
        config.webhook_url = Some("   ".to_string());
        assert!(DiscordNotifier::from_config(&config).unwrap().is_none());

        config.webhook_url = Some("https://discord.com/api/webhooks/1/abc".to_string());
        assert!(DiscordNotifier::from_config(&config).unwrap().is_some());
    }

    #[test]
    fn test_offer_embed_creation() {
        let notifier = DiscordNotifier::new(
            &create_test_config(),
            Url::parse("https://discord.com/api/webhooks/1/abc").unwrap(),
        )
        .unwrap();
        let embed = notifier.create_offer_embed(&create_test_offer());

        assert!(embed["title"].as_str().unwrap().contains("iPhone 13 Pro 128GB"));
        assert_eq!(embed["url"], "https://www.olx.pl/d/oferta/iphone-13-pro-CID99-IDabc.html");
        assert_eq!(embed["color"].as_u64().unwrap(), u64::from(COLOR_OFFER));
        assert_eq!(embed["thumbnail"]["url"], "https://img.example.com/abc.jpg");

        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields[0]["value"], "**1900 zł**");
        assert_eq!(fields[1]["value"], "13 Pro");
        assert!(fields.iter().any(|f| f["value"] == "Gdańsk"));
        assert!(fields.iter().any(|f| f["value"] == "1700-2100 zł"));
        assert_eq!(embed["footer"]["text"], FOOTER);
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let notifier = DiscordNotifier::new(
            &create_test_config(),
            Url::parse("https://discord.com/api/webhooks/1/abc").unwrap(),
        )
        .unwrap();
        let mut offer = create_test_offer();
        offer.raw.title = "ż".repeat(500);

        let embed = notifier.create_offer_embed(&offer);
        let title = embed["title"].as_str().unwrap();
        assert_eq!(title.chars().filter(|c| *c == 'ż').count(), MAX_TITLE_CHARS);
    }

    #[tokio::test]
    async fn test_notify_posts_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/token"))
            .and(body_partial_json(json!({
                "username": "Price Bot",
                "avatar_url": "https://example.com/avatar.png"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier_for(&server).notify(&create_test_offer()).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_rejected_webhook_is_notify_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = notifier_for(&server).alert("Nothing found for 8h").await.unwrap_err();
        assert!(matches!(err, AppError::NotifyFailed { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_heartbeat_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"embeds": [{"title": "📊 Monitor status"}]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let stats = HeartbeatStats {
            last_found: Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap(),
            active_model_count: 4,
            catalog_size: 25,
            seen_count: 120,
        };
        let notifier = notifier_for(&server);
        let embed = notifier.create_status_embed(&stats);
        assert_eq!(embed["fields"][0]["value"], "2024-05-10 09:30 UTC");
        assert_eq!(embed["fields"][1]["value"], "4/25");
        assert_eq!(embed["fields"][2]["value"], "120");

        assert!(notifier.heartbeat(&stats).await.unwrap().success);
    }
}
