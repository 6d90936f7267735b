use crate::config::{ExportConfig, START_CURSOR};
use crate::error::{Error, Result};
use crate::fetcher::{Fetcher, ReviewQuery};
use crate::metrics::{MetricsCollector, MetricsSnapshot, SkipReason};
use crate::output::RowSink;
use crate::retry::{FailureKind, RetryPolicy};
use crate::review::{PageResponse, ReviewRecord};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlerState {
    Idle,
    Fetching,
    Processing,
    Done,
}

/// Which end condition stopped the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The page's summary reported zero matching reviews.
    SummaryExhausted,
    /// The page carried no continuation cursor.
    NoCursor,
    /// The continuation cursor had already been consumed in this run.
    RepeatedCursor,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Termination::SummaryExhausted => "listing exhausted",
            Termination::NoCursor => "no further cursor",
            Termination::RepeatedCursor => "cursor repeated",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub written: u64,
    pub checked: u64,
    pub pages: u64,
    pub termination: Termination,
}

impl CrawlSummary {
    /// `(written, checked)`
    pub fn counts(&self) -> (u64, u64) {
        (self.written, self.checked)
    }
}

/// Per-run pagination and de-duplication state.
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub seen_review_ids: HashSet<String>,
    pub seen_cursors: HashSet<String>,
    pub current_cursor: String,
    pub written: u64,
    pub checked: u64,
    pub pages: u64,
}

impl CrawlState {
    pub fn new(start_cursor: impl Into<String>) -> Self {
        Self {
            seen_review_ids: HashSet::new(),
            seen_cursors: HashSet::new(),
            current_cursor: start_cursor.into(),
            written: 0,
            checked: 0,
            pages: 0,
        }
    }

    /// Moves to the page's continuation cursor, or reports why the crawl ends here.
    ///
    /// The start cursor is never recorded as seen; only cursors handed out by
    /// the API are.
    pub fn advance(&mut self, page: &PageResponse) -> Option<Termination> {
        if page.summary_count() == Some(0) {
            return Some(Termination::SummaryExhausted);
        }
        let Some(next) = page.next_cursor() else {
            return Some(Termination::NoCursor);
        };
        if self.seen_cursors.contains(next) {
            return Some(Termination::RepeatedCursor);
        }
        self.seen_cursors.insert(next.to_string());
        self.current_cursor = next.to_string();
        None
    }

    fn summary(&self, termination: Termination) -> CrawlSummary {
        CrawlSummary {
            written: self.written,
            checked: self.checked,
            pages: self.pages,
            termination,
        }
    }
}

/// Walks a product's cursor-paginated review listing and streams new reviews to a sink.
pub struct ReviewCrawler<F: Fetcher> {
    fetcher: F,
    query: ReviewQuery,
    start_cursor: String,
    delay: Duration,
    retry: RetryPolicy,
    metrics: Arc<MetricsCollector>,
    state_watcher: watch::Sender<CrawlerState>,
}

impl<F: Fetcher> ReviewCrawler<F> {
    pub fn new(fetcher: F, query: ReviewQuery) -> Self {
        let (state_tx, _) = watch::channel(CrawlerState::Idle);

        Self {
            fetcher,
            query,
            start_cursor: START_CURSOR.to_string(),
            delay: Duration::ZERO,
            retry: RetryPolicy::default(),
            metrics: Arc::new(MetricsCollector::new()),
            state_watcher: state_tx,
        }
    }

    pub fn from_config(fetcher: F, config: &ExportConfig) -> Self {
        Self::new(fetcher, ReviewQuery::from_config(config))
            .with_start_cursor(config.start_cursor.clone())
            .with_delay(config.delay())
            .with_retry_policy(RetryPolicy::from(&config.retry))
    }

    pub fn with_start_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.start_cursor = cursor.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Runs the crawl to completion. The sink is closed on every exit path.
    pub async fn run(&self, sink: &mut dyn RowSink) -> Result<CrawlSummary> {
        let mut state = CrawlState::new(self.start_cursor.clone());
        let outcome = self.crawl(&mut state, sink).await;
        let closed = sink.close().await;
        self.set_state(CrawlerState::Done);

        let termination = outcome?;
        closed?;

        log::info!(
            "Crawl finished ({}): {} written, {} checked, {} pages",
            termination,
            state.written,
            state.checked,
            state.pages
        );
        Ok(state.summary(termination))
    }

    async fn crawl(&self, state: &mut CrawlState, sink: &mut dyn RowSink) -> Result<Termination> {
        loop {
            self.set_state(CrawlerState::Fetching);
            let page = self.fetch_page(&state.current_cursor).await?;

            self.set_state(CrawlerState::Processing);
            self.process_page(state, &page, sink).await?;

            if let Some(termination) = state.advance(&page) {
                return Ok(termination);
            }
            sleep(self.delay).await;
        }
    }

    /// Fetches the page at `cursor`, repeating the same request until it succeeds
    /// or the retry policy gives up.
    async fn fetch_page(&self, cursor: &str) -> Result<PageResponse> {
        let url = self.query.page_url(cursor)?;
        let mut failures = 0u32;

        loop {
            let kind = match self.fetcher.fetch(&url).await {
                Ok(page) if page.is_success() => return Ok(page),
                Ok(page) => {
                    log::warn!(
                        "Unsuccessful response (success={}) for cursor {:?}",
                        page.success,
                        cursor
                    );
                    FailureKind::Unsuccessful
                }
                Err(e) => {
                    log::warn!("Fetch failed for cursor {:?}: {}", cursor, e);
                    FailureKind::Transport
                }
            };

            failures += 1;
            self.metrics.record_failure(kind);
            if self.retry.exhausted(failures) {
                return Err(Error::RetriesExhausted {
                    cursor: cursor.to_string(),
                    attempts: failures,
                });
            }

            let cooldown = self.retry.cooldown(kind, failures);
            log::debug!("Retrying cursor {:?} in {:?} (attempt {})", cursor, cooldown, failures + 1);
            sleep(cooldown).await;
        }
    }

    async fn process_page(
        &self,
        state: &mut CrawlState,
        page: &PageResponse,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let reviews = page.reviews();
        state.pages += 1;
        state.checked += reviews.len() as u64;
        self.metrics.record_page(reviews.len());

        if state.pages == 1 {
            if let Some(summary) = &page.query_summary {
                log::info!(
                    "App {}: {} reviews ({} positive, {} negative) {}",
                    self.query.app_id,
                    summary.total_reviews.map_or("?".to_string(), |n| n.to_string()),
                    summary.total_positive.map_or("?".to_string(), |n| n.to_string()),
                    summary.total_negative.map_or("?".to_string(), |n| n.to_string()),
                    summary.review_score_desc.as_deref().unwrap_or_default()
                );
                if let Some(total) = summary.total_reviews {
                    self.metrics.set_total_reviews(total);
                }
            }
        }

        let language = self.query.language_filter();
        let before = state.written;
        for raw in reviews {
            if let Some(lang) = language {
                if raw.language.as_deref() != Some(lang) {
                    self.metrics.record_skip(SkipReason::Language);
                    continue;
                }
            }

            let Some(id) = raw.recommendationid.as_deref() else {
                self.metrics.record_skip(SkipReason::MissingId);
                continue;
            };
            if state.seen_review_ids.contains(id) {
                self.metrics.record_skip(SkipReason::Duplicate);
                continue;
            }
            state.seen_review_ids.insert(id.to_string());

            sink.write(&ReviewRecord::from(raw)).await?;
            state.written += 1;
            self.metrics.increment_written();
        }

        log::debug!(
            "Page {} (cursor {:?}): {} entries, {} new",
            state.pages,
            state.current_cursor,
            reviews.len(),
            state.written - before
        );
        Ok(())
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn watch_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        self.metrics.watch()
    }

    pub fn watch_state(&self) -> watch::Receiver<CrawlerState> {
        self.state_watcher.subscribe()
    }

    fn set_state(&self, state: CrawlerState) {
        self.state_watcher.send_replace(state);
    }
}
