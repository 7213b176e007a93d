//! All-time-high tracking.
//!
//! `evaluate` is the pure comparison; `HighWaterMarks` keeps one mark per pair
//! for the lifetime of the watcher. Marks start at zero and never decrease.

use serde::Serialize;
use std::collections::HashMap;

use crate::PairId;

/// Result of comparing a sample against the current mark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub is_new_high: bool,
    pub mark: f64,
}

/// Compare `sample` against `mark`. Only a strictly greater sample is a new high.
pub fn evaluate(sample: f64, mark: f64) -> Evaluation {
    if sample > mark {
        Evaluation {
            is_new_high: true,
            mark: sample,
        }
    } else {
        Evaluation {
            is_new_high: false,
            mark,
        }
    }
}

/// Raised when a pair's rate exceeds its recorded high.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHigh {
    pub pair: PairId,
    pub rate: f64,
    pub previous: f64,
}

#[derive(Debug, Default, Clone)]
pub struct HighWaterMarks {
    marks: HashMap<PairId, f64>,
}

impl HighWaterMarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. Non-finite rates are ignored.
    pub fn observe(&mut self, pair: &PairId, rate: f64) -> Option<NewHigh> {
        if !rate.is_finite() {
            return None;
        }

        let previous = self.mark(pair);
        let eval = evaluate(rate, previous);
        if !eval.is_new_high {
            return None;
        }

        self.marks.insert(pair.clone(), eval.mark);
        Some(NewHigh {
            pair: pair.clone(),
            rate,
            previous,
        })
    }

    pub fn mark(&self, pair: &PairId) -> f64 {
        self.marks.get(pair).copied().unwrap_or(0.0)
    }

    pub fn snapshot(&self) -> HashMap<PairId, f64> {
        self.marks.clone()
    }
}
