use async_trait::async_trait;
use crate::{CurrencyPair, FxError, PairId};

/// Trait for exchange-rate feeds polled by the rate watcher.
///
/// An empty `pairs` slice asks for every pair the source knows about.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn poll(&self, pairs: &[PairId]) -> Result<Vec<CurrencyPair>, FxError>;

    fn name(&self) -> &str;
}
