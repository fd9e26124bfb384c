use chrono::{DateTime, Duration, Utc};

use crate::catalog::PriceCatalog;
use crate::models::{ClassifiedOffer, FilterConfig, Rejection};

/// Rule evaluation for classified offers against the live `FilterConfig`.
pub struct OfferFilter {
    catalog: PriceCatalog,
}

impl OfferFilter {
    pub fn new(catalog: PriceCatalog) -> Self {
        Self { catalog }
    }

    pub fn passes(&self, offer: &ClassifiedOffer, config: &FilterConfig, now: DateTime<Utc>) -> bool {
        self.evaluate(offer, config, now).is_ok()
    }

    /// Runs the guards in order and reports the first one that fails.
    pub fn evaluate(
        &self,
        offer: &ClassifiedOffer,
        config: &FilterConfig,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        let model = match &offer.model {
            Some(model) if config.active_models.contains(model) => model,
            _ => return Err(Rejection::ModelInactive),
        };

        let price = offer.price.ok_or(Rejection::PriceMissing)?;
        let band = self.catalog.band(model).ok_or(Rejection::ModelInactive)?;
        if !band.contains(price) {
            return Err(Rejection::PriceOutOfBand);
        }

        let title = offer.title().to_lowercase();

        if !config.required_keywords.is_empty()
            && !config
                .required_keywords
                .iter()
                .any(|keyword| title.contains(&keyword.to_lowercase()))
        {
            return Err(Rejection::MissingKeyword);
        }

        if !config.include_damaged
            && config
                .blocked_keywords
                .iter()
                .any(|keyword| title.contains(&keyword.to_lowercase()))
        {
            return Err(Rejection::BlockedKeyword);
        }

        if config.ignore_age_limit {
            return Ok(());
        }

        let posted_at = offer.posted_at.ok_or(Rejection::AgeUnknown)?;
        if now.signed_duration_since(posted_at) > Duration::hours(i64::from(config.max_ad_age_hours)) {
            return Err(Rejection::TooOld);
        }

        Ok(())
    }
}
