//! Synthetic GBP rate feed.
//!
//! Every poll perturbs a fixed baseline table by a small random amount with a
//! slight upward bias, so the dashboard moves and new highs occur now and then.
//! `history` produces a daily series with a gentle upward trend for charting.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use fx_core::{round4, CurrencyPair, FxError, HistoryPoint, PairId, RateSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const MAX_HISTORY_DAYS: u32 = 365;

/// (pair, baseline rate, previous all-time high)
const BASELINE: &[(&str, f64, f64)] = &[
    ("GBP-USD", 1.2743, 1.2740),
    ("GBP-EUR", 1.1684, 1.1699),
    ("GBP-JPY", 192.85, 192.10),
    ("GBP-CHF", 1.1543, 1.1531),
];

#[derive(Debug, Clone)]
struct Baseline {
    pair: PairId,
    rate: f64,
    previous_all_time_high: f64,
}

pub struct SyntheticRateSource {
    baselines: Vec<Baseline>,
    rng: Mutex<StdRng>,
}

impl SyntheticRateSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic source for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let baselines = BASELINE
            .iter()
            .filter_map(|&(id, rate, previous_all_time_high)| {
                id.parse().ok().map(|pair| Baseline {
                    pair,
                    rate,
                    previous_all_time_high,
                })
            })
            .collect();

        Self {
            baselines,
            rng: Mutex::new(rng),
        }
    }

    /// Pairs this source can quote, in table order.
    pub fn pairs(&self) -> Vec<PairId> {
        self.baselines.iter().map(|b| b.pair.clone()).collect()
    }

    fn baseline(&self, pair: &PairId) -> Result<&Baseline, FxError> {
        self.baselines
            .iter()
            .find(|b| &b.pair == pair)
            .ok_or_else(|| FxError::UnknownPair(pair.to_string()))
    }

    /// Draw one uniform sample in `[0, 1)`.
    fn draw(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen::<f64>(),
            Err(poisoned) => poisoned.into_inner().gen::<f64>(),
        }
    }

    fn sample(&self, baseline: &Baseline) -> CurrencyPair {
        let change = (self.draw() - 0.48) * 0.01;
        let rate = round4(baseline.rate + change);
        let change_24h = round4(self.draw() * 0.01 - 0.005);

        CurrencyPair::new(
            baseline.pair.clone(),
            rate,
            change_24h,
            baseline.previous_all_time_high,
            Utc::now(),
        )
    }

    /// Daily series of `days + 1` points ending today, oldest first.
    pub fn history(&self, pair: &PairId, days: u32) -> Result<Vec<HistoryPoint>, FxError> {
        if days == 0 || days > MAX_HISTORY_DAYS {
            return Err(FxError::InvalidData(format!(
                "days must be between 1 and {}, got {}",
                MAX_HISTORY_DAYS, days
            )));
        }

        let base_rate = self.baseline(pair)?.rate;
        let today = Utc::now().date_naive();

        let points = (0..=days)
            .rev()
            .map(|i| {
                let date = today - Duration::days(i64::from(i));
                let random_factor = 0.995 + self.draw() * 0.02;
                let trend_factor = 1.0 - (f64::from(i) / f64::from(days)) * 0.05;
                HistoryPoint {
                    date: date.format("%Y-%m-%d").to_string(),
                    rate: round4(base_rate * random_factor * trend_factor),
                }
            })
            .collect();

        Ok(points)
    }
}

impl Default for SyntheticRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateSource for SyntheticRateSource {
    async fn poll(&self, pairs: &[PairId]) -> Result<Vec<CurrencyPair>, FxError> {
        if pairs.is_empty() {
            return Ok(self.baselines.iter().map(|b| self.sample(b)).collect());
        }

        let mut quotes = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let baseline = self.baseline(pair)?;
            quotes.push(self.sample(baseline));
        }

        tracing::debug!("Synthetic feed produced {} quotes", quotes.len());
        Ok(quotes)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
