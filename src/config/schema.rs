use crate::error::{Error, Result};
use crate::retry::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub const START_CURSOR: &str = "*";
pub const ALL_LANGUAGES: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExportConfig {
    #[serde(default)]
    #[validate(range(min = 1))]
    pub app_id: u64,

    #[serde(default)]
    #[validate]
    pub output: OutputConfig,

    #[serde(default = "default_delay")]
    pub delay_ms: u64,

    #[serde(default = "default_language")]
    #[validate(length(min = 1))]
    pub language: String,

    #[serde(default)]
    pub purchase_type: PurchaseType,

    #[serde(default)]
    pub review_type: ReviewType,

    #[serde(default)]
    pub filter_offtopic_activity: bool,

    #[serde(default = "default_cursor")]
    #[validate(length(min = 1))]
    pub start_cursor: String,

    #[serde(default = "default_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub num_per_page: u32,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            app_id: 0,
            output: OutputConfig::default(),
            delay_ms: default_delay(),
            language: default_language(),
            purchase_type: PurchaseType::default(),
            review_type: ReviewType::default(),
            filter_offtopic_activity: false,
            start_cursor: default_cursor(),
            base_url: default_base_url(),
            num_per_page: default_page_size(),
            request_timeout_secs: default_timeout(),
            retry: RetryConfig::default(),
            extends: None,
        }
    }
}

impl ExportConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Runs field validation plus the checks the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.output.delimiter_byte()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    #[validate(length(min = 1))]
    pub path: String,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            delimiter: default_delimiter(),
        }
    }
}

impl OutputConfig {
    /// The delimiter as the single byte the CSV writer expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter {
            '"' | '\r' | '\n' => Err(Error::Config(format!(
                "Delimiter {:?} would corrupt quoting or row boundaries",
                self.delimiter
            ))),
            d if d.is_ascii() => Ok(d as u8),
            d => Err(Error::Config(format!("Delimiter {:?} is not a single ASCII character", d))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    #[default]
    All,
    Steam,
    #[value(name = "non_steam")]
    NonSteam,
}

impl PurchaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseType::All => "all",
            PurchaseType::Steam => "steam",
            PurchaseType::NonSteam => "non_steam",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    #[default]
    All,
    Positive,
    Negative,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::All => "all",
            ReviewType::Positive => "positive",
            ReviewType::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_transport_cooldown")]
    pub transport_cooldown_ms: u64,

    #[serde(default = "default_unsuccessful_cooldown")]
    pub unsuccessful_cooldown_ms: u64,

    /// Unbounded when absent.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            transport_cooldown_ms: default_transport_cooldown(),
            unsuccessful_cooldown_ms: default_unsuccessful_cooldown(),
            max_attempts: None,
            backoff: Backoff::default(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            transport_cooldown: Duration::from_millis(config.transport_cooldown_ms),
            unsuccessful_cooldown: Duration::from_millis(config.unsuccessful_cooldown_ms),
            max_attempts: config.max_attempts,
            backoff: config.backoff,
        }
    }
}

fn default_delay() -> u64 {
    250
}

fn default_language() -> String {
    ALL_LANGUAGES.to_string()
}

fn default_cursor() -> String {
    START_CURSOR.to_string()
}

fn default_base_url() -> String {
    "https://store.steampowered.com".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_output_path() -> String {
    "steam_reviews.csv".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_transport_cooldown() -> u64 {
    5000
}

fn default_unsuccessful_cooldown() -> u64 {
    1000
}
