use crate::config::ExportConfig;
use crate::crawler::{CrawlSummary, ReviewCrawler};
use crate::error::Result;
use crate::fetcher::ReqwestFetcher;
use crate::metrics::MetricsCollector;
use crate::output::csv::CsvOutput;
use std::sync::Arc;

/// Exports every matching review of `config.app_id` to the configured output file.
///
/// The output is opened (and its header written) before the first request, so a
/// bad output path fails the run without touching the network.
pub async fn export_reviews(
    config: &ExportConfig,
    metrics: Option<Arc<MetricsCollector>>,
) -> Result<CrawlSummary> {
    config.check()?;

    let mut sink = CsvOutput::open(&config.output)?;
    let fetcher = ReqwestFetcher::new(config.request_timeout())?;
    let mut crawler = ReviewCrawler::from_config(fetcher, config);
    if let Some(metrics) = metrics {
        crawler = crawler.with_metrics(metrics);
    }

    log::info!(
        "Exporting reviews for app {} to {} (language: {})",
        config.app_id,
        config.output.path,
        config.language
    );
    crawler.run(&mut sink).await
}
