//! Model Module - External model artifacts
//!
//! Scaler, classifier and regressor are opaque collaborators loaded once at
//! startup. Everything downstream sees them only through the traits below,
//! so tests and alternative backends can swap them freely.

pub mod artifacts;
pub mod context;
pub mod inference;
pub mod scaler;

use serde::{Deserialize, Serialize};

use super::error::PredictionError;

// Re-export common types
pub use artifacts::{ArtifactPaths, ArtifactStatus};
pub use context::ModelContext;
pub use inference::{InferenceStats, OnnxClassifier, OnnxRegressor};
pub use scaler::{ScalerParams, JsonScaler};

/// Artifact identifiers (used in load reports)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    Regressor,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Regressor => "regressor",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// MODEL TRAITS
// ============================================================================

/// Feature scaling fitted at training time
pub trait Scaler: Send + Sync {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError>;
}

/// Binary risk classifier. Returns the raw class label.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<i64, PredictionError>;

    fn stats(&self) -> Option<InferenceStats> {
        None
    }
}

/// Lifespan regressor
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError>;

    fn stats(&self) -> Option<InferenceStats> {
        None
    }
}
