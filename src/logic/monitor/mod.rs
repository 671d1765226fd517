//! Monitor Module - Acquisition/Prediction Loop
//!
//! Runs the acquisition loop off the presentation thread and publishes
//! results through a bounded channel.
//!
//! ## Structure
//! - `pipeline`: Reading -> PredictionResult
//! - `history`: bounded window of recent results
//! - `worker`: background loop, stop signal, handle

pub mod history;
pub mod pipeline;
pub mod worker;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reading::Reading;
use super::risk::RiskLevel;
use super::sources::{SourceKind, SourceStats};

// Re-export main types for convenience
pub use history::{HistorySummary, PredictionHistory};
pub use pipeline::Predictor;
pub use worker::{Monitor, MonitorHandle, MonitorReport, StopSignal};

/// How the risk label was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMethod {
    Model,
    Rule,
    /// Rule forced High over the classifier
    Override,
}

/// How the lifespan was estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifespanMethod {
    Rule,
    Regressor,
}

/// Prediction output for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub reading: Reading,
    pub risk: RiskLevel,
    /// Years, always >= 0
    pub lifespan_estimate: f64,
    pub risk_method: RiskMethod,
    pub lifespan_method: LifespanMethod,
}

/// Events published to the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    Started { session_id: Uuid, source: SourceKind },
    Prediction(PredictionResult),
    PredictionFailed { reading: Reading, error: String },
    SourceFailed { error: String, fatal: bool },
    Stopped { session_id: Uuid, cycles: u64, source_stats: SourceStats },
}
