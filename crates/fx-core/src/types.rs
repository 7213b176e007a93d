use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FxError;

/// Currency pair identifier such as `GBP-USD`.
///
/// Accepts `BASE-QUOTE` or `BASE/QUOTE`, each code three ASCII letters.
/// Codes are upper-cased on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairId {
    base: String,
    quote: String,
}

impl PairId {
    pub fn new(base: &str, quote: &str) -> Result<Self, FxError> {
        let base = normalize_code(base)
            .ok_or_else(|| FxError::InvalidPair(format!("{}-{}", base, quote)))?;
        let quote = normalize_code(quote)
            .ok_or_else(|| FxError::InvalidPair(format!("{}-{}", base, quote)))?;
        Ok(Self { base, quote })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Human-readable form used in messages, e.g. `GBP/USD`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Parse a comma-separated list, skipping blank entries.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, FxError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

impl FromStr for PairId {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once(['-', '/'])
            .ok_or_else(|| FxError::InvalidPair(s.to_string()))?;
        Self::new(base, quote).map_err(|_| FxError::InvalidPair(s.to_string()))
    }
}

impl TryFrom<String> for PairId {
    type Error = FxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PairId> for String {
    fn from(value: PairId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

/// One rate sample for a currency pair. Regenerated on every poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyPair {
    pub id: PairId,
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    pub previous_all_time_high: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl CurrencyPair {
    pub fn new(
        id: PairId,
        rate: f64,
        change_24h: f64,
        previous_all_time_high: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            base_currency: id.base().to_string(),
            quote_currency: id.quote().to_string(),
            id,
            rate,
            change_24h,
            previous_all_time_high,
            timestamp,
        }
    }
}

/// Daily point of a historical rate series, for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub rate: f64,
}

/// An alert subscriber, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Subscriber {
    pub phone_number: String,
    pub notification_threshold: f64,
    pub subscribed: bool,
    pub created_at: String,
}

impl Subscriber {
    pub fn is_active(&self) -> bool {
        self.subscribed
    }
}

/// Round to 4 decimal places, the precision rates are quoted at.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
