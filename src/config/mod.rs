pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    ExportConfig, OutputConfig, PurchaseType, RetryConfig, ReviewType, ALL_LANGUAGES, START_CURSOR,
};
