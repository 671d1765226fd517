//! Prediction History - bounded window of recent results

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::PredictionResult;

/// Most recent results, oldest first
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    entries: VecDeque<PredictionResult>,
    capacity: usize,
    total_pushed: u64,
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        }
    }

    /// Push a result, evicting the oldest when full
    pub fn push(&mut self, result: PredictionResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
        self.total_pushed += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&PredictionResult> {
        self.entries.back()
    }

    pub fn to_vec(&self) -> Vec<PredictionResult> {
        self.entries.iter().cloned().collect()
    }

    /// Statistics over the current window
    pub fn summary(&self) -> HistorySummary {
        let n = self.entries.len();
        let high_risk_count = self.entries.iter().filter(|r| r.risk.is_high()).count();
        let (mean_lifespan, min_lifespan) = if n > 0 {
            let sum: f64 = self.entries.iter().map(|r| r.lifespan_estimate).sum();
            let min = self.entries.iter()
                .map(|r| r.lifespan_estimate)
                .fold(f64::INFINITY, f64::min);
            (sum / n as f64, min)
        } else {
            (0.0, 0.0)
        };

        HistorySummary {
            size: n,
            capacity: self.capacity,
            total_pushed: self.total_pushed,
            high_risk_count,
            mean_lifespan,
            min_lifespan,
        }
    }
}

/// History statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub size: usize,
    pub capacity: usize,
    pub total_pushed: u64,
    pub high_risk_count: usize,
    pub mean_lifespan: f64,
    pub min_lifespan: f64,
}
