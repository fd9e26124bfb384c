use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

use crate::config::ScraperConfig;
use crate::utils::error::{AppError, Result};

/// Body of one listing page plus where it was actually served from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    pub status: u16,
    pub body: String,
    pub response_time_ms: u64,
}

/// Anything that can hand the pipeline a listing page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

pub struct WebScraper {
    client: Client,
}

impl WebScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pl-PL,pl;q=0.9,en;q=0.5"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for WebScraper {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let start_time = std::time::Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::fetch_failed(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch_failed(url.as_str(), format!("HTTP {}", status)));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::fetch_failed(url.as_str(), e))?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
            response_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

/// URL of the `page`-th listing page. Page 1 is the base URL untouched; later
/// pages carry a `page` query parameter replacing any existing one.
pub fn page_url(base: &Url, page: u32) -> Url {
    if page <= 1 {
        return base.clone();
    }

    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("page", &page.to_string());
    url
}
