use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub pages_fetched: u64,
    pub transport_failures: u64,
    pub unsuccessful_responses: u64,
    pub reviews_checked: u64,
    pub reviews_written: u64,
    pub skipped_language: u64,
    pub skipped_duplicate: u64,
    pub skipped_missing_id: u64,
    /// Total reviews for the query, as reported by the first page's summary.
    pub total_reviews: Option<u64>,
    pub pages_per_second: f64,
    pub elapsed_seconds: f64,
}

impl MetricsSnapshot {
    pub fn retries(&self) -> u64 {
        self.transport_failures + self.unsuccessful_responses
    }
}
