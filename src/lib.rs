pub mod catalog;
pub mod classifier;
pub mod config;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod monitor;
pub mod pipeline;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod seen_store;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use catalog::{PriceBand, PriceCatalog};
pub use classifier::Classifier;
pub use config::AppConfig;
pub use extractor::{Extraction, ListingExtractor};
pub use filter::OfferFilter;
pub use models::{ClassifiedOffer, FilterConfig, FilterConfigStore, RawCandidate, SkipReason};
pub use monitor::{MonitorHealth, MonitorState};
pub use pipeline::{Pipeline, ScanReport};
pub use plugins::{HeartbeatStats, NotificationResult, Notifier};
pub use scheduler::{MonitorLoop, TickOutcome};
pub use scraper::{FetchedPage, PageSource, WebScraper};
pub use seen_store::SeenStore;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
