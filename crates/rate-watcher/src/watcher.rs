//! Scheduled polling task.
//!
//! The watcher owns the high-water marks. Each tick it polls the rate source,
//! publishes the quotes to the board, and for every alert pair that printed a
//! new high runs the dispatcher. Cycles run back to back inside one task, so a
//! cycle's notifications finish before the next poll starts.

use fx_core::{FxError, HighWaterMarks, NewHigh, PairId, RateSource};
use notification_service::{AlertDispatcher, DispatchReport};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::board::QuoteBoard;
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub interval: Duration,
    /// Pairs to poll. Empty means every pair the source knows.
    pub pairs: Vec<PairId>,
    /// Pairs whose new highs are sent to subscribers.
    pub alert_pairs: Vec<PairId>,
}

/// What one polling cycle observed and sent.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub quotes: usize,
    pub new_highs: Vec<NewHigh>,
    pub reports: Vec<DispatchReport>,
}

pub struct RateWatcher {
    source: Arc<dyn RateSource>,
    dispatcher: AlertDispatcher,
    board: QuoteBoard,
    config: WatcherConfig,
    marks: HighWaterMarks,
    cycles_run: u64,
}

impl RateWatcher {
    pub fn new(
        source: Arc<dyn RateSource>,
        dispatcher: AlertDispatcher,
        board: QuoteBoard,
        config: WatcherConfig,
    ) -> Self {
        Self {
            source,
            dispatcher,
            board,
            config,
            marks: HighWaterMarks::new(),
            cycles_run: 0,
        }
    }

    pub fn marks(&self) -> &HighWaterMarks {
        &self.marks
    }

    /// Poll once, update marks and board, and notify on new highs.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, FxError> {
        let quotes = self.source.poll(&self.config.pairs).await?;
        self.cycles_run += 1;

        let mut outcome = CycleOutcome {
            quotes: quotes.len(),
            ..CycleOutcome::default()
        };
        let mut raised = HashSet::new();

        for quote in &quotes {
            if let Some(high) = self.marks.observe(&quote.id, quote.rate) {
                raised.insert(high.pair.clone());
                if self.config.alert_pairs.contains(&high.pair) {
                    outcome.new_highs.push(high);
                }
            }
        }

        self.board
            .publish(quotes, self.marks.snapshot(), raised)
            .await;

        for high in &outcome.new_highs {
            tracing::info!(
                "New all-time high for {}: {:.4} (previous {:.4})",
                high.pair,
                high.rate,
                high.previous
            );
            match self.dispatcher.dispatch(high).await {
                Ok(report) => outcome.reports.push(report),
                Err(e) => tracing::error!("Failed to dispatch {} alert: {}", high.pair, e),
            }
        }

        Ok(outcome)
    }

    /// Run until `shutdown` fires. A cycle already in progress is allowed to
    /// finish, including any sends it started.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            "Rate watcher started via {} (every {}s, alerting on {})",
            self.source.name(),
            self.config.interval.as_secs(),
            self.config
                .alert_pairs
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!("Error in polling cycle: {}", e);
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Rate watcher stopping after {} cycles", self.cycles_run);
                    break;
                }
            }
        }
    }

    pub fn spawn(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
