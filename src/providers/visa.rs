use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::VisaProviderConfig;
use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use crate::core::rate::{RateQuote, RateSource};

const RATES_ENDPOINT: &str = "/cmsapi/fx/rates";
const REFERER: &str =
    "https://usa.visa.com/support/consumer/travel-support/exchange-rate-calculator.html";

/// Queries the Visa exchange rate calculator for one currency at a time.
pub struct VisaRateProvider {
    base_url: String,
    base_currency: String,
    client: reqwest::Client,
}

impl VisaRateProvider {
    pub fn new(base_url: &str, base_currency: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("Mozilla/5.0");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FxError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            base_currency: base_currency.to_string(),
            client,
        })
    }

    pub fn from_config(config: &VisaProviderConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.base_currency,
            config.timeout_secs.map(Duration::from_secs),
        )
    }
}

#[derive(Debug, Deserialize)]
struct VisaRateResponse {
    #[serde(rename = "originalValues")]
    original_values: OriginalValues,
}

#[derive(Debug, Deserialize)]
struct OriginalValues {
    #[serde(rename = "fxRateVisa", deserialize_with = "lenient_f64")]
    fx_rate_visa: f64,
    #[serde(rename = "fromCurrencyName")]
    from_currency_name: String,
    benchmarks: Vec<Benchmark>,
}

#[derive(Debug, Deserialize)]
struct Benchmark {
    #[serde(rename = "benchmarkFxRate", deserialize_with = "lenient_f64")]
    benchmark_fx_rate: f64,
    #[serde(rename = "markupWithoutAdditionalFee", deserialize_with = "lenient_f64")]
    markup_without_additional_fee: f64,
}

/// Accepts both JSON numbers and numeric strings.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[async_trait]
impl RateSource for VisaRateProvider {
    #[instrument(name = "VisaRateFetch", skip(self), fields(currency = %currency))]
    async fn fetch(&self, currency: CurrencyCode) -> Result<RateQuote> {
        let today = Local::now().format("%m/%d/%Y").to_string();
        let url = reqwest::Url::parse_with_params(
            &format!("{}{}", self.base_url, RATES_ENDPOINT),
            &[
                ("amount", "10000"),
                ("fee", "0"),
                ("utcConvertedDate", today.as_str()),
                ("exchangedate", today.as_str()),
                ("fromCurr", self.base_currency.as_str()),
                ("toCurr", currency.as_str()),
            ],
        )
        .map_err(|e| FxError::Network(format!("Invalid rate URL for {currency}: {e}")))?;
        debug!("Requesting rate from {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header("dnt", "1")
            .header(reqwest::header::REFERER, REFERER)
            .send()
            .await
            .map_err(|e| FxError::Network(format!("Request error: {e} for currency: {currency}")))?;

        if !response.status().is_success() {
            return Err(FxError::Network(format!(
                "HTTP error: {} for currency: {}",
                response.status(),
                currency
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FxError::Network(format!("Failed to read response for {currency}: {e}")))?;

        let data: VisaRateResponse = serde_json::from_str(&text).map_err(|e| {
            FxError::Parse(format!("Failed to parse JSON response for {currency}: {e}"))
        })?;

        let values = data.original_values;
        let benchmark = values
            .benchmarks
            .into_iter()
            .next()
            .ok_or_else(|| FxError::Parse(format!("No benchmark rate found for {currency}")))?;

        for (field, rate) in [
            ("fxRateVisa", values.fx_rate_visa),
            ("benchmarkFxRate", benchmark.benchmark_fx_rate),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(FxError::Parse(format!(
                    "Invalid {field} {rate} for {currency}"
                )));
            }
        }
        if !benchmark.markup_without_additional_fee.is_finite() {
            return Err(FxError::Parse(format!("Invalid markup for {currency}")));
        }

        Ok(RateQuote {
            visa_rate: values.fx_rate_visa,
            currency_name: values.from_currency_name,
            benchmark_rate: benchmark.benchmark_fx_rate,
            markup_fraction: benchmark.markup_without_additional_fee,
        })
    }
}
