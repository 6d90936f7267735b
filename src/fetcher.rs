use crate::config::{ExportConfig, PurchaseType, ReviewType, ALL_LANGUAGES};
use crate::error::{Error, Result};
use crate::review::PageResponse;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fixed query parameters for one product's review listing.
#[derive(Debug, Clone)]
pub struct ReviewQuery {
    pub base_url: String,
    pub app_id: u64,
    pub num_per_page: u32,
    pub language: String,
    pub purchase_type: PurchaseType,
    pub review_type: ReviewType,
    pub filter_offtopic_activity: bool,
}

impl ReviewQuery {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            app_id: config.app_id,
            num_per_page: config.num_per_page,
            language: config.language.clone(),
            purchase_type: config.purchase_type,
            review_type: config.review_type,
            filter_offtopic_activity: config.filter_offtopic_activity,
        }
    }

    /// `None` when every language is accepted.
    pub fn language_filter(&self) -> Option<&str> {
        Some(self.language.as_str()).filter(|lang| *lang != ALL_LANGUAGES)
    }

    /// Builds the request URL for the page starting at `cursor`.
    pub fn page_url(&self, cursor: &str) -> Result<String> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/appreviews/{}", base, self.app_id))?;
        url.query_pairs_mut()
            .append_pair("json", "1")
            .append_pair("num_per_page", &self.num_per_page.to_string())
            .append_pair("filter", "recent")
            .append_pair("number", "0")
            .append_pair("purchase_type", self.purchase_type.as_str())
            .append_pair("language", &self.language)
            .append_pair(
                "filter_offtopic_activity",
                if self.filter_offtopic_activity { "1" } else { "0" },
            )
            .append_pair("review_type", self.review_type.as_str())
            .append_pair("cursor", cursor);
        Ok(url.into())
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieves and decodes one page. Any error is treated as transient by the crawler.
    async fn fetch(&self, url: &str) -> Result<PageResponse>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("steam-reviews/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<PageResponse> {
        log::debug!("Requesting: {}", url);

        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Internal(format!("HTTP error: {}", status)));
        }

        let page = res.json::<PageResponse>().await?;
        Ok(page)
    }
}
