mod board;
mod shutdown;
mod watcher;

pub use board::{QuoteBoard, RatesSnapshot};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use watcher::{CycleOutcome, RateWatcher, WatcherConfig};
