//! Core business logic: rates, caching policy and trend summaries

pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod rate;
pub mod trend;

// Re-export main types for cleaner imports
pub use cache::RateCacheService;
pub use currency::CurrencyCode;
pub use error::FxError;
pub use rate::{CacheEntry, RateObservation, RateQuote, RateSource};
