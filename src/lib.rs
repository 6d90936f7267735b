pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod metrics;
pub mod output;
pub mod retry;
pub mod review;

pub use config::{ConfigLoader, ExportConfig};
pub use crawler::{CrawlState, CrawlSummary, CrawlerState, ReviewCrawler, Termination};
pub use error::{Error, Result};
pub use export::export_reviews;
pub use fetcher::{Fetcher, ReqwestFetcher, ReviewQuery};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use output::RowSink;
pub use retry::{Backoff, RetryPolicy};
pub use review::{PageResponse, ReviewRecord};
