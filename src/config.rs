use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;
use validator::Validate;

use crate::catalog::PriceCatalog;
use crate::models::FilterConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationsConfig,
    /// Rule set the process starts with; the config editor replaces it later.
    #[serde(default)]
    pub filter: FilterConfig,
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// First listing page; later pages add a `page` query parameter.
    pub base_url: String,
    /// Regex matched against the path of every link to spot offer pages.
    pub offer_path_pattern: String,
    pub user_agent: String,
    /// Seconds.
    pub request_timeout: u64,
    pub page_delay_ms: u64,
    /// Zone the site prints "Dzisiaj o 14:20" style times in.
    #[serde(default = "default_site_time_zone")]
    pub time_zone: Tz,
}

fn default_site_time_zone() -> Tz {
    chrono_tz::Europe::Warsaw
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// Sleep used while monitoring is switched off or no notifier is set up.
    pub idle_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub silence_alert_hours: u32,
    pub heartbeat_interval_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub seen_ads_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
    pub avatar_url: Option<String>,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Layers `default`, `{RUN_MODE}` and `local` files from `config_dir`, then
    /// `HUNTER__*` environment variables.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let layer = |name: &str| config_dir.join(name).to_string_lossy().into_owned();

        let s = Config::builder()
            .add_source(File::with_name(&layer("default")))
            .add_source(File::with_name(&layer(&run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::with_name(&layer("local")).required(false))
            .add_source(Environment::with_prefix("HUNTER").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Bare variable kept for deployments that only export the webhook.
        if config.notifications.discord.webhook_url.is_none() {
            config.notifications.discord.webhook_url =
                env::var("DISCORD_WEBHOOK").ok().filter(|url| !url.trim().is_empty());
        }

        config.filter = config.filter.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if Url::parse(&self.scraper.base_url).is_err() {
            return Err(ConfigError::Message("Invalid base URL format".into()));
        }

        if let Err(e) = Regex::new(&self.scraper.offer_path_pattern) {
            return Err(ConfigError::Message(format!("Invalid offer_path_pattern: {}", e)));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scheduler.min_interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler min_interval_secs must be greater than 0".into()));
        }

        if self.scheduler.min_interval_secs > self.scheduler.max_interval_secs {
            return Err(ConfigError::Message(
                "Scheduler min_interval_secs cannot exceed max_interval_secs".into(),
            ));
        }

        if self.scheduler.silence_alert_hours == 0 || self.scheduler.heartbeat_interval_minutes == 0 {
            return Err(ConfigError::Message(
                "Scheduler silence and heartbeat intervals must be greater than 0".into(),
            ));
        }

        if let Some(webhook) = &self.notifications.discord.webhook_url {
            if Url::parse(webhook).is_err() {
                return Err(ConfigError::Message("Invalid Discord webhook URL".into()));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        if let Err(e) = self.filter.validate() {
            return Err(ConfigError::Message(format!("Invalid filter defaults: {}", e)));
        }

        Ok(())
    }

    /// The filter the process starts with, with model names checked against
    /// `catalog`. An empty model list enables the whole catalog.
    pub fn startup_filter(&self, catalog: &PriceCatalog) -> Result<FilterConfig, ConfigError> {
        let mut filter = self.filter.clone();
        if filter.active_models.is_empty() {
            filter.active_models = catalog.keys().map(str::to_string).collect();
            return Ok(filter);
        }

        filter.canonicalize_models(catalog).map_err(|unknown| {
            ConfigError::Message(format!("Unknown models in filter.active_models: {}", unknown.join(", ")))
        })?;
        Ok(filter)
    }
}
