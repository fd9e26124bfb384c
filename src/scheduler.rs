use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::models::FilterConfigStore;
use crate::monitor::MonitorHealth;
use crate::pipeline::Pipeline;
use crate::plugins::traits::{HeartbeatStats, Notifier};
use crate::scraper::PageSource;
use crate::utils::error::Result;

/// What a single loop iteration did, deciding how long to sleep afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Monitoring switched off or nowhere to send results.
    Idle,
    Completed { found: usize },
}

/// Drives repeated scans: Sleeping -> Scanning -> Sleeping, with an error
/// backoff in place of the regular sleep when a scan fails.
pub struct MonitorLoop<S: PageSource> {
    pipeline: Pipeline<S>,
    filters: FilterConfigStore,
    notifier: Option<Arc<dyn Notifier>>,
    health: Arc<MonitorHealth>,
    catalog_size: usize,
    config: SchedulerConfig,
    shutdown: CancellationToken,
}

impl<S: PageSource> MonitorLoop<S> {
    pub fn new(
        pipeline: Pipeline<S>,
        filters: FilterConfigStore,
        notifier: Option<Arc<dyn Notifier>>,
        health: Arc<MonitorHealth>,
        config: SchedulerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let catalog_size = pipeline.catalog().len();
        Self {
            pipeline,
            filters,
            notifier,
            health,
            catalog_size,
            config,
            shutdown,
        }
    }

    pub fn health(&self) -> &Arc<MonitorHealth> {
        &self.health
    }

    /// Loops until the shutdown token fires, then flushes the seen set.
    pub async fn run(&self) {
        tracing::info!(
            min_interval_secs = self.config.min_interval_secs,
            max_interval_secs = self.config.max_interval_secs,
            "Monitoring loop started"
        );

        loop {
            let delay = match self.tick(Utc::now()).await {
                Ok(TickOutcome::Idle) => Duration::from_secs(self.config.idle_interval_secs),
                Ok(TickOutcome::Completed { .. }) => self.next_interval(),
                Err(e) => {
                    tracing::error!(error = %e, backoff_secs = self.config.error_backoff_secs, "Scan failed");
                    counter!("hunter_scan_errors_total").increment(1);
                    self.health.record_error(&e.to_string(), Utc::now()).await;
                    Duration::from_secs(self.config.error_backoff_secs)
                }
            };

            tracing::debug!(sleep_secs = delay.as_secs(), "Sleeping until next scan");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match self.pipeline.seen().save().await {
            Ok(()) => tracing::info!("Monitoring loop stopped, seen offers flushed"),
            Err(e) => tracing::error!(
                path = %self.pipeline.seen().path().display(),
                error = %e,
                "Failed to flush seen offers on shutdown"
            ),
        }
    }

    /// One iteration: scan, deliver, persist and run the health checks.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let config = self.filters.snapshot().await;

        let Some(notifier) = self.notifier.as_deref() else {
            tracing::debug!("No notifier configured, skipping scan");
            return Ok(TickOutcome::Idle);
        };
        if !config.active {
            tracing::debug!("Monitoring inactive, skipping scan");
            return Ok(TickOutcome::Idle);
        }

        let report = self.pipeline.run_once(&config, now).await?;
        let found = report.offers.len();

        for offer in &report.offers {
            if let Err(e) = notifier.notify(offer).await {
                tracing::warn!(url = offer.identifier(), error = %e, "Failed to deliver offer");
                self.count_notify_failure().await;
            }
        }

        self.health.record_scan(found, now).await;

        if found > 0 {
            self.pipeline.seen().save().await?;
        }

        self.check_health(notifier, config.active_models.len(), now).await;

        Ok(TickOutcome::Completed { found })
    }

    async fn check_health(&self, notifier: &dyn Notifier, active_model_count: usize, now: DateTime<Utc>) {
        if let Some(silent_for) = self.health.check_silence(now).await {
            let message = format!(
                "No new offers for {}. Monitoring is still running.",
                format_span(silent_for)
            );
            tracing::info!(silent_minutes = silent_for.num_minutes(), "Sending silence alert");
            if let Err(e) = notifier.alert(&message).await {
                tracing::warn!(error = %e, "Failed to deliver silence alert");
                self.count_notify_failure().await;
            }
        }

        if let Some(last_found) = self.health.check_heartbeat(now).await {
            let stats = HeartbeatStats {
                last_found,
                active_model_count,
                catalog_size: self.catalog_size,
                seen_count: self.pipeline.seen().len().await,
            };
            if let Err(e) = notifier.heartbeat(&stats).await {
                tracing::warn!(error = %e, "Failed to deliver heartbeat");
                self.count_notify_failure().await;
            }
        }
    }

    async fn count_notify_failure(&self) {
        counter!("hunter_notifications_failed_total").increment(1);
        self.health.record_notify_failure().await;
    }

    fn next_interval(&self) -> Duration {
        let (min, max) = (self.config.min_interval_secs, self.config.max_interval_secs);
        let secs = if min >= max {
            min
        } else {
            rand::rng().random_range(min..=max)
        };
        Duration::from_secs(secs)
    }
}

fn format_span(span: ChronoDuration) -> String {
    let hours = span.num_hours();
    let minutes = span.num_minutes() % 60;
    if minutes == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}
