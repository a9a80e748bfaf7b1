//! Rate abstractions and core types

use crate::core::currency::CurrencyCode;
use crate::core::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Normalized upstream payload for one currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub visa_rate: f64,
    pub currency_name: String,
    pub benchmark_rate: f64,
    /// Markup over the benchmark as a fraction, e.g. `0.0021` for 0.21%.
    pub markup_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub currency: CurrencyCode,
    pub currency_name: String,
    pub visa_rate: f64,
    pub benchmark_rate: f64,
    pub markup_percent: f64,
}

impl RateObservation {
    pub fn from_quote(at: DateTime<Utc>, currency: CurrencyCode, quote: RateQuote) -> Self {
        Self {
            // Log timestamps carry second precision only
            timestamp: truncate_to_second(at.naive_utc()),
            currency,
            currency_name: quote.currency_name,
            visa_rate: quote.visa_rate,
            benchmark_rate: quote.benchmark_rate,
            markup_percent: quote.markup_fraction * 100.0,
        }
    }
}

fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    DateTime::from_timestamp(ts.and_utc().timestamp(), 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(ts)
}

/// Outcome of the most recent refresh attempt for a currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheEntry {
    Rate(RateObservation),
    Error { error: String },
}

impl CacheEntry {
    pub fn error(message: impl Into<String>) -> Self {
        CacheEntry::Error {
            error: message.into(),
        }
    }

    pub fn observation(&self) -> Option<&RateObservation> {
        match self {
            CacheEntry::Rate(obs) => Some(obs),
            CacheEntry::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CacheEntry::Error { .. })
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self, currency: CurrencyCode) -> Result<RateQuote>;
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
