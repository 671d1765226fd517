//! Model Context
//!
//! Holds the loaded artifacts for the lifetime of the process. Built once at
//! startup and shared (via `Arc`) with the monitor worker.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::artifacts::{read_artifact, ArtifactPaths, ArtifactStatus};
use super::inference::{InferenceStats, OnnxClassifier, OnnxRegressor};
use super::scaler::JsonScaler;
use super::{ArtifactKind, Classifier, Regressor, Scaler};
use crate::logic::error::{ModelLoadError, PredictionError};

/// Loaded models. Any of them may be absent.
#[derive(Clone, Default)]
pub struct ModelContext {
    scaler: Option<Arc<dyn Scaler>>,
    classifier: Option<Arc<dyn Classifier>>,
    regressor: Option<Arc<dyn Regressor>>,
    status: HashMap<ArtifactKind, ArtifactStatus>,
}

/// Scaler + classifier pair needed for model-based risk
pub struct ClassificationModels<'a> {
    pub scaler: &'a dyn Scaler,
    pub classifier: &'a dyn Classifier,
}

impl ModelContext {
    /// Context with nothing loaded (rule-only operation)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every configured artifact. Failures are logged and recorded per file;
    /// they never abort startup.
    pub fn load(paths: &ArtifactPaths) -> Self {
        let mut ctx = Self::empty();

        match load_scaler(&paths.scaler) {
            Ok(scaler) => ctx.set_scaler(Arc::new(scaler)),
            Err(e) => ctx.record_failure(e),
        }

        match load_onnx(ArtifactKind::Classifier, &paths.classifier, OnnxClassifier::from_bytes) {
            Ok(classifier) => ctx.set_classifier(Arc::new(classifier)),
            Err(e) => ctx.record_failure(e),
        }

        match &paths.regressor {
            Some(path) => match load_onnx(ArtifactKind::Regressor, path, OnnxRegressor::from_bytes) {
                Ok(regressor) => ctx.set_regressor(Arc::new(regressor)),
                Err(e) => ctx.record_failure(e),
            },
            None => {
                ctx.status.insert(ArtifactKind::Regressor, ArtifactStatus::NotConfigured);
            }
        }

        ctx
    }

    pub fn with_scaler(mut self, scaler: Arc<dyn Scaler>) -> Self {
        self.set_scaler(scaler);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.set_classifier(classifier);
        self
    }

    pub fn with_regressor(mut self, regressor: Arc<dyn Regressor>) -> Self {
        self.set_regressor(regressor);
        self
    }

    fn set_scaler(&mut self, scaler: Arc<dyn Scaler>) {
        log::info!("[Models] Scaler loaded successfully");
        self.scaler = Some(scaler);
        self.status.insert(ArtifactKind::Scaler, ArtifactStatus::Loaded);
    }

    fn set_classifier(&mut self, classifier: Arc<dyn Classifier>) {
        log::info!("[Models] Classifier loaded successfully");
        self.classifier = Some(classifier);
        self.status.insert(ArtifactKind::Classifier, ArtifactStatus::Loaded);
    }

    fn set_regressor(&mut self, regressor: Arc<dyn Regressor>) {
        log::info!("[Models] Regressor loaded successfully");
        self.regressor = Some(regressor);
        self.status.insert(ArtifactKind::Regressor, ArtifactStatus::Loaded);
    }

    fn record_failure(&mut self, error: ModelLoadError) {
        log::error!("[Models] {}", error);
        self.status.insert(error.artifact, ArtifactStatus::from(&error.failure));
    }

    pub fn status(&self, kind: ArtifactKind) -> ArtifactStatus {
        self.status.get(&kind).cloned().unwrap_or(ArtifactStatus::NotConfigured)
    }

    /// Latency counters of an ONNX-backed model, if it reports any
    pub fn inference_stats(&self, kind: ArtifactKind) -> Option<InferenceStats> {
        match kind {
            ArtifactKind::Classifier => self.classifier.as_ref().and_then(|c| c.stats()),
            ArtifactKind::Regressor => self.regressor.as_ref().and_then(|r| r.stats()),
            ArtifactKind::Scaler => None,
        }
    }

    pub fn regressor(&self) -> Option<&dyn Regressor> {
        self.regressor.as_deref()
    }

    pub fn has_classification(&self) -> bool {
        self.scaler.is_some() && self.classifier.is_some()
    }

    /// Scaler + classifier, or `ModelsUnavailable` naming what is missing
    pub fn require_classification(&self) -> Result<ClassificationModels<'_>, PredictionError> {
        match (self.scaler.as_deref(), self.classifier.as_deref()) {
            (Some(scaler), Some(classifier)) => Ok(ClassificationModels { scaler, classifier }),
            _ => {
                let missing: Vec<&str> = [
                    (ArtifactKind::Scaler, self.scaler.is_none()),
                    (ArtifactKind::Classifier, self.classifier.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(kind, _)| kind.as_str())
                .collect();

                Err(PredictionError::ModelsUnavailable(format!(
                    "{} not loaded",
                    missing.join(" and ")
                )))
            }
        }
    }
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelContext")
            .field("scaler", &self.scaler.is_some())
            .field("classifier", &self.classifier.is_some())
            .field("regressor", &self.regressor.is_some())
            .field("status", &self.status)
            .finish()
    }
}

// ============================================================================
// LOADERS
// ============================================================================

fn load_scaler(path: &Path) -> Result<JsonScaler, ModelLoadError> {
    let bytes = read_artifact(ArtifactKind::Scaler, path)?;
    let content = String::from_utf8(bytes)
        .map_err(|e| ModelLoadError::invalid(ArtifactKind::Scaler, path, e))?;

    JsonScaler::from_json(&content)
        .map_err(|e| ModelLoadError::invalid(ArtifactKind::Scaler, path, e))
}

fn load_onnx<T>(
    kind: ArtifactKind,
    path: &Path,
    build: fn(&[u8], &Path) -> Result<T, String>,
) -> Result<T, ModelLoadError> {
    let bytes = read_artifact(kind, path)?;
    build(&bytes, path).map_err(|e| ModelLoadError::invalid(kind, path, e))
}
