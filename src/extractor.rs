use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use url::Url;

use crate::models::{ParseIssue, RawCandidate};
use crate::scraper::FetchedPage;
use crate::utils::error::{AppError, Result};

/// How many ancestors above an offer link are searched for its price, time
/// and image. Keeps the scan cost per link constant on hostile markup.
pub const MAX_ANCESTOR_HOPS: usize = 6;

const MIN_TITLE_CHARS: usize = 3;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
    static ref HEADING: Selector = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();
    static ref IMAGE: Selector = Selector::parse("img").unwrap();

    // "1 250 zł", "2.499,99 zł do negocjacji", "800"
    static ref PRICE_SHAPE: Regex = Regex::new(
        r"(?is)^(?P<amount>\d{1,3}(?:[ \u{a0}\u{202f}.,]\d{3})+|\d+)(?:[.,](?P<fraction>\d{1,2}))?\s*(?:(?:zł|zl|pln).*)?$"
    ).unwrap();

    static ref CURRENCY: Regex = Regex::new(r"(?i)\d\s*(?:zł|zl|pln)").unwrap();

    static ref TIME_SHAPE: Regex = Regex::new(
        r"(?i)\b(?:teraz|przed chwilą|dzisiaj|wczoraj|just now|now|today|yesterday)\b|\b\d+\s*(?:godz\w*|minut\w*|min|dni|dzie[nń]\w*|hours?|hrs?|minutes?|mins?|days?)\b"
    ).unwrap();

    static ref JUST_NOW: Regex = Regex::new(r"(?i)\b(?:teraz|przed chwilą|just now|now)\b").unwrap();
    static ref RELATIVE_AGE: Regex = Regex::new(
        r"(?i)\b(?P<n>\d+)\s*(?:(?P<h>godz\w*|hours?|hrs?)|(?P<m>minut\w*|min|minutes?|mins?)|(?P<d>dni|dzie[nń]\w*|days?))\b"
    ).unwrap();
    static ref DAY_WORD: Regex = Regex::new(r"(?i)\b(?P<today>dzisiaj|today)\b|\b(?P<yesterday>wczoraj|yesterday)\b").unwrap();
    static ref CLOCK: Regex = Regex::new(r"\b(?P<h>\d{1,2}):(?P<m>\d{2})\b").unwrap();
}

/// Result of scanning one page: the usable candidates in document order and
/// the offer links that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub candidates: Vec<RawCandidate>,
    pub skipped: Vec<(String, ParseIssue)>,
}

/// Heuristic offer extraction from listing markup with no stable schema.
pub struct ListingExtractor {
    offer_path: Regex,
}

impl ListingExtractor {
    pub fn new(offer_path_pattern: &str) -> Result<Self> {
        let offer_path = Regex::new(offer_path_pattern).map_err(|e| {
            AppError::Validation(format!("Invalid offer path pattern '{}': {}", offer_path_pattern, e))
        })?;
        Ok(Self { offer_path })
    }

    pub fn extract(&self, page: &FetchedPage) -> Extraction {
        self.extract_html(&page.body, &page.url)
    }

    pub fn extract_html(&self, html: &str, page_url: &Url) -> Extraction {
        let document = Html::parse_document(html);

        let mut extraction = Extraction::default();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut failed: HashMap<String, ParseIssue> = HashMap::new();
        let mut failed_order: Vec<String> = Vec::new();

        for anchor in document.select(&ANCHOR) {
            let Some(identifier) = self.offer_identifier(anchor, page_url) else {
                continue;
            };
            if emitted.contains(&identifier) {
                continue;
            }

            match self.candidate_from_anchor(anchor, &identifier, page_url) {
                Ok(candidate) => {
                    emitted.insert(identifier);
                    extraction.candidates.push(candidate);
                }
                Err(issue) => {
                    if failed.insert(identifier.clone(), issue).is_none() {
                        failed_order.push(identifier);
                    }
                }
            }
        }

        extraction.skipped = failed_order
            .into_iter()
            .filter(|id| !emitted.contains(id))
            .filter_map(|id| failed.remove(&id).map(|issue| (id, issue)))
            .collect();

        tracing::debug!(
            url = %page_url,
            candidates = extraction.candidates.len(),
            skipped = extraction.skipped.len(),
            "Extracted listing page"
        );

        extraction
    }

    fn candidate_from_anchor(
        &self,
        anchor: ElementRef<'_>,
        identifier: &str,
        page_url: &Url,
    ) -> std::result::Result<RawCandidate, ParseIssue> {
        let card = self.card_for(anchor, identifier, page_url);

        let (title, heading) = title_for(card, anchor).ok_or(ParseIssue::MissingTitle)?;

        // Digits inside the heading ("iPhone <b>13</b> Pro") are never the price.
        let fragments: Vec<String> = card
            .descendants()
            .filter(|node| heading.is_none_or(|h| !node.ancestors().any(|a| a.id() == h.id())))
            .filter_map(|node| node.value().as_text().map(|text| normalize_whitespace(text)))
            .filter(|text| !text.is_empty())
            .collect();

        let price_shaped: Vec<&String> = fragments
            .iter()
            .filter(|text| PRICE_SHAPE.is_match(text))
            .collect();
        let price_text = price_shaped
            .iter()
            .find(|text| CURRENCY.is_match(text))
            .or_else(|| price_shaped.first())
            .map(|text| text.to_string())
            .ok_or(ParseIssue::MissingPrice)?;
        if parse_price(&price_text).is_none() {
            return Err(ParseIssue::UnparseablePrice);
        }

        let time_text = fragments
            .iter()
            .filter(|text| **text != title && **text != price_text)
            .find(|text| TIME_SHAPE.is_match(text))
            .cloned()
            .unwrap_or_default();

        let location = time_text
            .split_once(" - ")
            .map(|(location, _)| location.trim().to_string())
            .unwrap_or_default();

        Ok(RawCandidate {
            identifier: identifier.to_string(),
            title,
            price_text,
            time_text,
            image_url: image_url(card, page_url).unwrap_or_default(),
            location,
        })
    }

    /// Highest ancestor (within `MAX_ANCESTOR_HOPS`) that does not also wrap
    /// a link to some other offer.
    fn card_for<'a>(&self, anchor: ElementRef<'a>, identifier: &str, page_url: &Url) -> ElementRef<'a> {
        let mut card = anchor;
        for ancestor in anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(MAX_ANCESTOR_HOPS)
        {
            let foreign_link = ancestor.select(&ANCHOR).any(|other| {
                self.offer_identifier(other, page_url)
                    .is_some_and(|other_id| other_id != identifier)
            });
            if foreign_link {
                break;
            }
            card = ancestor;
        }
        card
    }

    fn offer_identifier(&self, anchor: ElementRef<'_>, page_url: &Url) -> Option<String> {
        let href = anchor.value().attr("href")?.trim();
        let url = page_url.join(href).ok()?;
        if !matches!(url.scheme(), "http" | "https") || !self.offer_path.is_match(url.path()) {
            return None;
        }
        Some(normalize_identifier(url))
    }
}

/// Canonical dedup key for an offer URL: absolute, without query or fragment.
pub fn normalize_identifier(mut url: Url) -> String {
    url.set_fragment(None);
    url.set_query(None);
    url.to_string()
}

/// Numeric value of a price-shaped fragment, in the site's currency.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let captures = PRICE_SHAPE.captures(text.trim())?;
    let amount: String = captures
        .name("amount")?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    let number = match captures.name("fraction") {
        Some(fraction) => format!("{}.{}", amount, fraction.as_str()),
        None => amount,
    };
    Decimal::from_str(&number).ok()
}

/// Best-effort absolute time for a relative age phrase, evaluated against
/// `now` in the site's local time zone. Day words without a clock time are
/// treated as unknown.
pub fn parse_posted_at<Tz: TimeZone>(text: &str, now: DateTime<Tz>) -> Option<DateTime<Utc>> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(captures) = RELATIVE_AGE.captures(text) {
        let n: i64 = captures["n"].parse().ok()?;
        let delta = if captures.name("h").is_some() {
            Duration::try_hours(n)?
        } else if captures.name("m").is_some() {
            Duration::try_minutes(n)?
        } else {
            Duration::try_days(n)?
        };
        return now.checked_sub_signed(delta).map(|t| t.with_timezone(&Utc));
    }

    if let Some(captures) = DAY_WORD.captures(text) {
        let days_back = if captures.name("today").is_some() { 0 } else { 1 };
        let clock = CLOCK.captures(text)?;
        let time = NaiveTime::from_hms_opt(clock["h"].parse().ok()?, clock["m"].parse().ok()?, 0)?;
        let date = now
            .date_naive()
            .checked_sub_days(chrono::Days::new(days_back))?;
        return now
            .timezone()
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|t| t.with_timezone(&Utc));
    }

    if JUST_NOW.is_match(text) {
        return Some(now.with_timezone(&Utc));
    }

    None
}

fn image_url(card: ElementRef<'_>, page_url: &Url) -> Option<String> {
    let img = card.select(&IMAGE).next()?;
    let attrs = img.value();
    let usable = |src: &&str| !src.is_empty() && !src.starts_with("data:");
    let src = attrs
        .attr("src")
        .map(str::trim)
        .filter(usable)
        .or_else(|| attrs.attr("data-src").map(str::trim).filter(usable))
        .or_else(|| {
            attrs
                .attr("srcset")
                .and_then(|set| set.split_whitespace().next())
                .filter(usable)
        })?;
    page_url.join(src).ok().map(|url| url.to_string())
}

/// Title text plus the heading it came from. Falls back to the link text,
/// then an image `alt`, neither of which is reported as a heading.
fn title_for<'a>(card: ElementRef<'a>, anchor: ElementRef<'a>) -> Option<(String, Option<ElementRef<'a>>)> {
    let long_enough = |text: &String| text.chars().count() >= MIN_TITLE_CHARS;

    if let Some((heading, text)) = card
        .select(&HEADING)
        .map(|heading| (heading, element_text(heading)))
        .find(|(_, text)| long_enough(text))
    {
        return Some((text, Some(heading)));
    }

    let link_text = element_text(anchor);
    if long_enough(&link_text) {
        return Some((link_text, None));
    }

    card.select(&IMAGE)
        .filter_map(|img| img.value().attr("alt"))
        .map(normalize_whitespace)
        .find(long_enough)
        .map(|alt| (alt, None))
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
