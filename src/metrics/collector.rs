use crate::metrics::snapshot::MetricsSnapshot;
use crate::retry::FailureKind;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Why a raw entry did not produce a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Language,
    Duplicate,
    MissingId,
}

#[derive(Clone)]
pub struct MetricsCollector {
    pages_fetched: Arc<AtomicU64>,
    transport_failures: Arc<AtomicU64>,
    unsuccessful_responses: Arc<AtomicU64>,
    reviews_checked: Arc<AtomicU64>,
    reviews_written: Arc<AtomicU64>,
    skipped_language: Arc<AtomicU64>,
    skipped_duplicate: Arc<AtomicU64>,
    skipped_missing_id: Arc<AtomicU64>,
    // Zero until the first page reports a total.
    total_reviews: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            pages_fetched: Arc::new(AtomicU64::new(0)),
            transport_failures: Arc::new(AtomicU64::new(0)),
            unsuccessful_responses: Arc::new(AtomicU64::new(0)),
            reviews_checked: Arc::new(AtomicU64::new(0)),
            reviews_written: Arc::new(AtomicU64::new(0)),
            skipped_language: Arc::new(AtomicU64::new(0)),
            skipped_duplicate: Arc::new(AtomicU64::new(0)),
            skipped_missing_id: Arc::new(AtomicU64::new(0)),
            total_reviews: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&self, entries: usize) {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
        self.reviews_checked
            .fetch_add(entries as u64, Ordering::SeqCst);
    }

    pub fn record_failure(&self, kind: FailureKind) {
        let counter = match kind {
            FailureKind::Transport => &self.transport_failures,
            FailureKind::Unsuccessful => &self.unsuccessful_responses,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_written(&self) {
        self.reviews_written.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_skip(&self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::Language => &self.skipped_language,
            SkipReason::Duplicate => &self.skipped_duplicate,
            SkipReason::MissingId => &self.skipped_missing_id,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_total_reviews(&self, total: u64) {
        self.total_reviews.store(total, Ordering::SeqCst);
    }

    /// Publishes a fresh snapshot every 500ms until the receiver is dropped.
    pub fn watch(&self) -> watch::Receiver<MetricsSnapshot> {
        let (tx, rx) = watch::channel(self.snapshot());
        let metrics = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(metrics.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let pages = self.pages_fetched.load(Ordering::SeqCst);
        let total = self.total_reviews.load(Ordering::SeqCst);
        let elapsed = self.start_time.elapsed().as_secs_f64();

        MetricsSnapshot {
            pages_fetched: pages,
            transport_failures: self.transport_failures.load(Ordering::SeqCst),
            unsuccessful_responses: self.unsuccessful_responses.load(Ordering::SeqCst),
            reviews_checked: self.reviews_checked.load(Ordering::SeqCst),
            reviews_written: self.reviews_written.load(Ordering::SeqCst),
            skipped_language: self.skipped_language.load(Ordering::SeqCst),
            skipped_duplicate: self.skipped_duplicate.load(Ordering::SeqCst),
            skipped_missing_id: self.skipped_missing_id.load(Ordering::SeqCst),
            total_reviews: (total > 0).then_some(total),
            pages_per_second: if elapsed > 0.0 {
                pages as f64 / elapsed
            } else {
                0.0
            },
            elapsed_seconds: elapsed,
        }
    }
}
