//! Tracked currencies

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CurrencyCode {
    Jpy,
    Eur,
    Gbp,
    Thb,
    Cad,
    Aud,
    Inr,
    Mxn,
    Chf,
    Cny,
    Sek,
    Nzd,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 12] = [
        CurrencyCode::Jpy,
        CurrencyCode::Eur,
        CurrencyCode::Gbp,
        CurrencyCode::Thb,
        CurrencyCode::Cad,
        CurrencyCode::Aud,
        CurrencyCode::Inr,
        CurrencyCode::Mxn,
        CurrencyCode::Chf,
        CurrencyCode::Cny,
        CurrencyCode::Sek,
        CurrencyCode::Nzd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Jpy => "JPY",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Thb => "THB",
            CurrencyCode::Cad => "CAD",
            CurrencyCode::Aud => "AUD",
            CurrencyCode::Inr => "INR",
            CurrencyCode::Mxn => "MXN",
            CurrencyCode::Chf => "CHF",
            CurrencyCode::Cny => "CNY",
            CurrencyCode::Sek => "SEK",
            CurrencyCode::Nzd => "NZD",
        }
    }

    /// Regional indicator flag shown next to the code.
    pub fn flag(&self) -> &'static str {
        match self {
            CurrencyCode::Jpy => "🇯🇵",
            CurrencyCode::Eur => "🇪🇺",
            CurrencyCode::Gbp => "🇬🇧",
            CurrencyCode::Thb => "🇹🇭",
            CurrencyCode::Cad => "🇨🇦",
            CurrencyCode::Aud => "🇦🇺",
            CurrencyCode::Inr => "🇮🇳",
            CurrencyCode::Mxn => "🇲🇽",
            CurrencyCode::Chf => "🇨🇭",
            CurrencyCode::Cny => "🇨🇳",
            CurrencyCode::Sek => "🇸🇪",
            CurrencyCode::Nzd => "🇳🇿",
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.flag(), self.as_str())
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        CurrencyCode::ALL
            .into_iter()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| anyhow!("Unsupported currency code: {}", s))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}
