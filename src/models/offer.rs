use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::PriceBand;

/// One listing element as scraped, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Absolute offer URL; the dedup key.
    pub identifier: String,
    pub title: String,
    pub price_text: String,
    /// Empty when the card carried no recognizable time fragment.
    pub time_text: String,
    pub image_url: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedOffer {
    #[serde(flatten)]
    pub raw: RawCandidate,
    pub model: Option<String>,
    pub price: Option<Decimal>,
    pub posted_at: Option<DateTime<Utc>>,
    pub price_band: Option<PriceBand>,
}

impl ClassifiedOffer {
    pub fn identifier(&self) -> &str {
        &self.raw.identifier
    }

    pub fn title(&self) -> &str {
        &self.raw.title
    }

    /// Human readable price, e.g. "1 250 zł" as shown on the site.
    pub fn formatted_price(&self) -> String {
        match self.price {
            Some(price) => format!("{} zł", price.normalize()),
            None => self.raw.price_text.clone(),
        }
    }
}

/// Why a candidate markup fragment could not become a `RawCandidate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseIssue {
    MissingTitle,
    MissingPrice,
    UnparseablePrice,
}

/// Filter guard that turned an offer down, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    ModelInactive,
    PriceMissing,
    PriceOutOfBand,
    MissingKeyword,
    BlockedKeyword,
    AgeUnknown,
    TooOld,
}

/// Per-candidate outcome that drops it from a scan without failing the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    ParseSkipped(ParseIssue),
    AlreadySeen,
    Unclassifiable,
    Rejected(Rejection),
}

impl SkipReason {
    /// Stable label used for log fields and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::ParseSkipped(ParseIssue::MissingTitle) => "missing_title",
            SkipReason::ParseSkipped(ParseIssue::MissingPrice) => "missing_price",
            SkipReason::ParseSkipped(ParseIssue::UnparseablePrice) => "unparseable_price",
            SkipReason::AlreadySeen => "already_seen",
            SkipReason::Unclassifiable => "unclassifiable",
            SkipReason::Rejected(Rejection::ModelInactive) => "model_inactive",
            SkipReason::Rejected(Rejection::PriceMissing) => "price_missing",
            SkipReason::Rejected(Rejection::PriceOutOfBand) => "price_out_of_band",
            SkipReason::Rejected(Rejection::MissingKeyword) => "missing_keyword",
            SkipReason::Rejected(Rejection::BlockedKeyword) => "blocked_keyword",
            SkipReason::Rejected(Rejection::AgeUnknown) => "age_unknown",
            SkipReason::Rejected(Rejection::TooOld) => "too_old",
        }
    }
}
