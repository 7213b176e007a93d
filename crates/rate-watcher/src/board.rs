use chrono::{DateTime, Utc};
use fx_core::{CurrencyPair, PairId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct BoardState {
    quotes: Vec<CurrencyPair>,
    highs: HashMap<PairId, f64>,
    new_highs: HashSet<PairId>,
    updated_at: Option<DateTime<Utc>>,
}

/// What the dashboard reads: latest quotes plus the all-time-high marks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesSnapshot {
    pub pairs: Vec<CurrencyPair>,
    pub highs: BTreeMap<String, f64>,
    /// Pairs whose latest sample set a new high.
    pub new_highs: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Latest quotes shared between the watcher (writer) and the API (readers).
#[derive(Clone, Default)]
pub struct QuoteBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl QuoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board with one poll's results.
    pub async fn publish(
        &self,
        quotes: Vec<CurrencyPair>,
        highs: HashMap<PairId, f64>,
        new_highs: HashSet<PairId>,
    ) {
        let mut state = self.inner.write().await;
        state.quotes = quotes;
        state.highs = highs;
        state.new_highs = new_highs;
        state.updated_at = Some(Utc::now());
    }

    pub async fn quote(&self, pair: &PairId) -> Option<CurrencyPair> {
        let state = self.inner.read().await;
        state.quotes.iter().find(|q| &q.id == pair).cloned()
    }

    pub async fn snapshot(&self) -> RatesSnapshot {
        let state = self.inner.read().await;
        let mut new_highs: Vec<String> = state.new_highs.iter().map(|p| p.to_string()).collect();
        new_highs.sort();

        RatesSnapshot {
            pairs: state.quotes.clone(),
            highs: state
                .highs
                .iter()
                .map(|(pair, mark)| (pair.to_string(), *mark))
                .collect(),
            new_highs,
            updated_at: state.updated_at,
        }
    }
}
