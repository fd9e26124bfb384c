use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use metrics::counter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::catalog::PriceCatalog;
use crate::classifier::Classifier;
use crate::extractor::{self, ListingExtractor};
use crate::filter::OfferFilter;
use crate::models::{ClassifiedOffer, FilterConfig, RawCandidate, SkipReason};
use crate::scraper::{self, PageSource};
use crate::seen_store::SeenStore;
use crate::utils::error::Result;

/// Outcome of one scan over the configured page range.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Newly qualified offers, in page then document order.
    pub offers: Vec<ClassifiedOffer>,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub candidates: usize,
    pub skipped: BTreeMap<&'static str, usize>,
    /// Set when shutdown cut the page walk short.
    pub interrupted: bool,
}

impl ScanReport {
    fn skip(&mut self, identifier: &str, reason: SkipReason) {
        tracing::trace!(identifier, reason = reason.label(), "Skipped candidate");
        counter!("hunter_candidates_skipped_total", "reason" => reason.label()).increment(1);
        *self.skipped.entry(reason.label()).or_default() += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Fetch, extract, classify, filter and dedup, page by page.
pub struct Pipeline<S: PageSource> {
    source: S,
    extractor: ListingExtractor,
    classifier: Classifier,
    filter: OfferFilter,
    seen: Arc<SeenStore>,
    base_url: Url,
    page_delay: Duration,
    time_zone: Tz,
    shutdown: CancellationToken,
}

impl<S: PageSource> Pipeline<S> {
    pub fn new(
        source: S,
        extractor: ListingExtractor,
        catalog: PriceCatalog,
        seen: Arc<SeenStore>,
        base_url: Url,
        page_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            extractor,
            classifier: Classifier::new(catalog.clone()),
            filter: OfferFilter::new(catalog),
            seen,
            base_url,
            page_delay,
            time_zone: chrono_tz::Europe::Warsaw,
            shutdown,
        }
    }

    /// Zone used to read clock times printed on listing pages.
    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn seen(&self) -> &Arc<SeenStore> {
        &self.seen
    }

    pub fn catalog(&self) -> &PriceCatalog {
        self.classifier.catalog()
    }

    /// Runs one scan against `config`. Page fetch failures are logged and
    /// counted; they never fail the scan.
    pub async fn run_once(&self, config: &FilterConfig, now: DateTime<Utc>) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        if !config.active {
            tracing::debug!("Monitoring inactive, skipping scan");
            return Ok(report);
        }

        let pages = config.page_count();
        for page in 1..=pages {
            if page > 1 && !self.pause_between_pages().await {
                tracing::info!(page, "Shutdown requested, ending scan early");
                report.interrupted = true;
                break;
            }

            let url = scraper::page_url(&self.base_url, page);
            let fetched = match self.source.fetch(&url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::warn!(page, url = %url, error = %e, "Failed to fetch listing page, continuing");
                    counter!("hunter_pages_failed_total").increment(1);
                    report.pages_failed += 1;
                    continue;
                }
            };

            counter!("hunter_pages_fetched_total").increment(1);
            report.pages_fetched += 1;
            tracing::debug!(page, url = %fetched.url, status = fetched.status, response_time_ms = fetched.response_time_ms, "Fetched listing page");

            let extraction = self.extractor.extract(&fetched);
            report.candidates += extraction.candidates.len() + extraction.skipped.len();

            for (identifier, issue) in &extraction.skipped {
                report.skip(identifier, SkipReason::ParseSkipped(*issue));
            }

            for candidate in extraction.candidates {
                match self.qualify(candidate, config, now).await {
                    Ok(offer) => {
                        tracing::info!(
                            model = offer.model.as_deref().unwrap_or("?"),
                            price = %offer.formatted_price(),
                            url = offer.identifier(),
                            "Found offer"
                        );
                        report.offers.push(offer);
                    }
                    Err((identifier, reason)) => report.skip(&identifier, reason),
                }
            }
        }

        counter!("hunter_offers_found_total").increment(report.offers.len() as u64);
        tracing::info!(
            pages_fetched = report.pages_fetched,
            pages_failed = report.pages_failed,
            candidates = report.candidates,
            skipped = report.skipped_total(),
            found = report.offers.len(),
            "Scan finished"
        );

        Ok(report)
    }

    async fn qualify(
        &self,
        candidate: RawCandidate,
        config: &FilterConfig,
        now: DateTime<Utc>,
    ) -> std::result::Result<ClassifiedOffer, (String, SkipReason)> {
        if self.seen.contains(&candidate.identifier).await {
            return Err((candidate.identifier, SkipReason::AlreadySeen));
        }

        let Some(model) = self.classifier.classify(&candidate.title) else {
            return Err((candidate.identifier, SkipReason::Unclassifiable));
        };

        let offer = ClassifiedOffer {
            price: extractor::parse_price(&candidate.price_text),
            posted_at: extractor::parse_posted_at(&candidate.time_text, now.with_timezone(&self.time_zone)),
            price_band: self.classifier.catalog().band(&model),
            model: Some(model),
            raw: candidate,
        };

        if let Err(rejection) = self.filter.evaluate(&offer, config, now) {
            return Err((offer.raw.identifier, SkipReason::Rejected(rejection)));
        }

        if !self.seen.insert(offer.identifier()).await {
            return Err((offer.raw.identifier, SkipReason::AlreadySeen));
        }

        Ok(offer)
    }

    /// Returns `false` when shutdown was requested during the pause.
    async fn pause_between_pages(&self) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        if self.page_delay.is_zero() {
            return true;
        }
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.page_delay) => true,
        }
    }
}
