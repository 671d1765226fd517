//! Error Types
//!
//! Error taxonomy cho toàn bộ service: model loading, sources, prediction, config.

use std::path::PathBuf;

use thiserror::Error;

use super::model::ArtifactKind;

// ============================================================================
// MODEL LOADING
// ============================================================================

/// Why a single artifact could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    /// File does not exist
    #[error("file not found")]
    Missing,
    /// File exists but could not be decoded
    #[error("failed to decode: {0}")]
    Invalid(String),
    /// Sidecar digest does not match file content
    #[error("checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, Error)]
#[error("Failed to load {artifact} from {path:?}: {failure}")]
pub struct ModelLoadError {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
    pub failure: LoadFailure,
}

impl ModelLoadError {
    pub fn missing(artifact: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self { artifact, path: path.into(), failure: LoadFailure::Missing }
    }

    pub fn invalid(artifact: ArtifactKind, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            artifact,
            path: path.into(),
            failure: LoadFailure::Invalid(reason.to_string()),
        }
    }
}

// ============================================================================
// SOURCES
// ============================================================================

#[derive(Debug, Error)]
pub enum SourceError {
    /// Serial port could not be opened
    #[error("Serial connect error on {port}: {reason}")]
    SerialConnect { port: String, reason: String },

    /// Read failed (not a timeout)
    #[error("Source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream closed, no more readings will arrive
    #[error("Source exhausted")]
    Exhausted,
}

impl SourceError {
    /// Fatal errors end the acquisition loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Exhausted | SourceError::SerialConnect { .. })
    }
}

/// A serial line that does not match the record format
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReading {
    #[error("expected 6 fields, got {0}")]
    FieldCount(usize),
    #[error("header line")]
    Header,
    #[error("field {index} is not a valid number: {value:?}")]
    BadNumber { index: usize, value: String },
}

// ============================================================================
// PREDICTION
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum PredictionError {
    #[error("Scaler failed: {0}")]
    Scaler(String),

    #[error("Classifier failed: {0}")]
    Classifier(String),

    #[error("Regressor failed: {0}")]
    Regressor(String),

    #[error("Feature mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Models unavailable: {0}")]
    ModelsUnavailable(String),
}

// ============================================================================
// CONFIG + TOP LEVEL
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error("Failed to spawn worker: {0}")]
    Spawn(String),
}
