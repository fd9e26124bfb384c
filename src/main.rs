use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

use listing_hunter::config::LoggingConfig;
use listing_hunter::plugins::notifiers::DiscordNotifier;
use listing_hunter::web::{create_router, AppState};
use listing_hunter::{
    AppConfig, FilterConfigStore, ListingExtractor, MonitorHealth, MonitorLoop, Notifier, Pipeline,
    PriceCatalog, SeenStore, WebScraper,
};

#[derive(Parser, Debug)]
#[command(name = "listing-hunter", version, about)]
struct Args {
    /// Directory holding default.toml and its overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Run a single scan, deliver what it finds, then exit
    #[arg(long)]
    once: bool,

    /// Run a single scan and print the report without notifying or saving
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::load(&args.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir.display()))?;

    let _log_guard = init_tracing(&config.logging)?;
    info!("Starting Listing Hunter...");

    let single_run = args.once || args.dry_run;
    if config.metrics.enabled && !single_run {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.metrics.port)))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port = config.metrics.port, "Prometheus exporter listening");
    }

    let catalog = PriceCatalog::default();
    let filters = FilterConfigStore::new(config.startup_filter(&catalog)?);

    let seen = Arc::new(SeenStore::open(&config.storage.seen_ads_path).await);
    let shutdown = CancellationToken::new();

    let pipeline = Pipeline::new(
        WebScraper::new(&config.scraper)?,
        ListingExtractor::new(&config.scraper.offer_path_pattern)?,
        catalog.clone(),
        seen.clone(),
        Url::parse(&config.scraper.base_url)?,
        Duration::from_millis(config.scraper.page_delay_ms),
        shutdown.clone(),
    )
    .with_time_zone(config.scraper.time_zone);

    if args.dry_run {
        let snapshot = filters.snapshot().await;
        let report = pipeline.run_once(snapshot.as_ref(), Utc::now()).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let notifier = DiscordNotifier::from_config(&config.notifications.discord)?
        .map(|discord| Arc::new(discord) as Arc<dyn Notifier>);
    if notifier.is_none() {
        warn!("No Discord webhook configured, scans stay paused until one is set");
    }

    let health = Arc::new(MonitorHealth::new(
        Utc::now(),
        config.scheduler.silence_alert_hours,
        config.scheduler.heartbeat_interval_minutes,
    ));

    let state = AppState {
        filters: filters.clone(),
        catalog: Arc::new(catalog),
        health: health.clone(),
        seen: seen.clone(),
        notifier_configured: notifier.is_some(),
        started_at: Utc::now(),
    };

    let monitor = MonitorLoop::new(
        pipeline,
        filters,
        notifier,
        health,
        config.scheduler.clone(),
        shutdown.clone(),
    );

    if args.once {
        let outcome = monitor.tick(Utc::now()).await?;
        info!(?outcome, "Single scan finished");
        return Ok(());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Config editor listening on http://{}", addr);

    let monitor_task = tokio::spawn(async move { monitor.run().await });

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    monitor_task.await?;
    info!("Shutdown complete");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listing_hunter=debug,tower_http=info"));

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "listing-hunter.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to initialise tracing")?;

    Ok(guard)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutting down...");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}
