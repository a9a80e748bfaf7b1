//! Row composition shared by the web page and the terminal view.

use crate::core::cache::RateCacheService;
use crate::core::currency::CurrencyCode;
use crate::core::rate::{CacheEntry, TIMESTAMP_FORMAT};
use crate::core::trend;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub currency: String,
    pub name: String,
    pub visa_rate: String,
    pub benchmark_rate: String,
    pub markup: String,
    pub trend: String,
    /// Numeric markup, `None` for placeholder rows.
    pub markup_value: Option<f64>,
}

impl RateRow {
    /// Formats a cache entry, degrading to a placeholder row when there is
    /// nothing usable to show.
    pub fn compose(
        currency: CurrencyCode,
        entry: &CacheEntry,
        history: &[f64],
        trend_window: usize,
    ) -> Self {
        let Some(obs) = entry.observation() else {
            return Self::placeholder(currency);
        };
        if ![obs.visa_rate, obs.benchmark_rate, obs.markup_percent]
            .iter()
            .all(|v| v.is_finite())
        {
            return Self::placeholder(currency);
        }

        let mut markups = history.to_vec();
        markups.push(obs.markup_percent);
        RateRow {
            currency: currency.label(),
            name: obs.currency_name.clone(),
            visa_rate: format!("{:.6}", obs.visa_rate),
            benchmark_rate: format!("{:.6}", obs.benchmark_rate),
            markup: format!("{:.4}%", obs.markup_percent),
            trend: trend::summarize(&markups, trend_window),
            markup_value: Some(obs.markup_percent),
        }
    }

    pub fn placeholder(currency: CurrencyCode) -> Self {
        RateRow {
            currency: currency.to_string(),
            name: PLACEHOLDER.to_string(),
            visa_rate: PLACEHOLDER.to_string(),
            benchmark_rate: PLACEHOLDER.to_string(),
            markup: PLACEHOLDER.to_string(),
            trend: String::new(),
            markup_value: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.markup_value.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RatesView {
    pub rows: Vec<RateRow>,
    pub last_updated: String,
}

/// Refreshes stale currencies and builds one row per currency.
///
/// History is read before refreshing, so a freshly fetched markup shows up
/// once, as the last point of its trend.
pub async fn rates_view(
    cache: &RateCacheService,
    currencies: &[CurrencyCode],
    trend_window: usize,
    now: DateTime<Utc>,
    on_progress: &(dyn Fn(CurrencyCode) + Send + Sync),
) -> RatesView {
    let history = cache.log().markup_history().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read observation log, trends will be empty");
        HashMap::new()
    });

    let rows = cache
        .refresh_all_with_progress(currencies, now, on_progress)
        .await
        .into_iter()
        .map(|(code, entry)| {
            let past = history.get(&code).map(Vec::as_slice).unwrap_or_default();
            RateRow::compose(code, &entry, past, trend_window)
        })
        .collect();

    RatesView {
        rows,
        last_updated: format_last_refresh(cache.last_refresh()),
    }
}

pub fn format_last_refresh(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "Never".to_string(),
        |ts| format!("{} UTC", ts.format(TIMESTAMP_FORMAT)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::RateObservation;
    use chrono::NaiveDate;

    fn entry(markup: f64) -> CacheEntry {
        CacheEntry::Rate(RateObservation {
            timestamp: NaiveDate::from_ymd_opt(2025, 2, 3)
                .unwrap()
                .and_hms_opt(4, 5, 6)
                .unwrap(),
            currency: CurrencyCode::Inr,
            currency_name: "Indian Rupee".to_string(),
            visa_rate: 83.123456789,
            benchmark_rate: 82.9,
            markup_percent: markup,
        })
    }

    #[test]
    fn test_compose_formats_values() {
        let row = RateRow::compose(CurrencyCode::Inr, &entry(0.25), &[0.1, 0.4], 20);
        assert_eq!(row.currency, "🇮🇳 INR");
        assert_eq!(row.name, "Indian Rupee");
        assert_eq!(row.visa_rate, "83.123457");
        assert_eq!(row.benchmark_rate, "82.900000");
        assert_eq!(row.markup, "0.2500%");
        assert_eq!(row.trend.chars().count(), 3);
        assert!(!row.is_placeholder());
    }

    #[test]
    fn test_error_entry_becomes_placeholder() {
        let row = RateRow::compose(CurrencyCode::Eur, &CacheEntry::error("boom"), &[], 20);
        assert_eq!(row, RateRow::placeholder(CurrencyCode::Eur));
        assert_eq!(row.currency, "EUR");
        assert_eq!(row.markup, "N/A");
        assert!(row.is_placeholder());
    }

    #[test]
    fn test_non_finite_values_become_placeholder() {
        let row = RateRow::compose(CurrencyCode::Inr, &entry(f64::NAN), &[], 20);
        assert!(row.is_placeholder());
    }

    #[test]
    fn test_format_last_refresh() {
        assert_eq!(format_last_refresh(None), "Never");
        let at = NaiveDate::from_ymd_opt(2025, 2, 3)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap()
            .and_utc();
        assert_eq!(format_last_refresh(Some(at)), "2025-02-03 04:05:06 UTC");
    }
}
