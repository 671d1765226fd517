//! Inference Engine - ONNX Runtime Integration
//!
//! Load và chạy ONNX classifier/regressor exported from the training pipeline.
//! Input is a single `[1, N]` f32 row; the first graph output is read back.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;

use super::{Classifier, Regressor};
use crate::logic::error::PredictionError;

// ============================================================================
// SESSION WRAPPER
// ============================================================================

/// ONNX session plus latency counters
pub struct OnnxModel {
    session: Mutex<Session>,
    output_name: String,
    model_path: String,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

/// Inference statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceStats {
    pub model_path: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

impl OnnxModel {
    /// Build a session from model bytes (already read and checksum-verified)
    pub fn from_bytes(model_bytes: &[u8], model_path: &Path) -> Result<Self, String> {
        log::info!("Loading ONNX model from: {:?} ({} bytes)", model_path, model_bytes.len());

        let session = Session::builder()
            .map_err(|e| format!("Failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| format!("Failed to set optimization: {}", e))?
            .commit_from_memory(model_bytes)
            .map_err(|e| format!("Failed to load model: {}", e))?;

        let output_name = session.outputs.first()
            .map(|o| o.name.clone())
            .ok_or_else(|| "No output defined".to_string())?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            model_path: model_path.display().to_string(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        })
    }

    /// Run one row through the graph and hand the first output to `extract`
    fn run<T>(
        &self,
        features: &[f64],
        extract: impl FnOnce(&ort::value::DynValue) -> Result<T, String>,
    ) -> Result<T, String> {
        let start_time = std::time::Instant::now();

        let row: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let input_array = Array2::<f32>::from_shape_vec((1, row.len()), row)
            .map_err(|e| format!("Array error: {}", e))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| format!("Tensor error: {}", e))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![input_tensor])
            .map_err(|e| format!("Inference failed: {}", e))?;

        let output = outputs.get(&self.output_name)
            .ok_or_else(|| "No output".to_string())?;

        let value = extract(output)?;

        let elapsed = start_time.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(elapsed, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Ok(value)
    }

    pub fn stats(&self) -> InferenceStats {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        InferenceStats {
            model_path: self.model_path.clone(),
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}

/// First element of an i64 or f32 output tensor, as f64
fn first_scalar(output: &ort::value::DynValue) -> Result<f64, String> {
    if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
        return data.first().map(|v| *v as f64).ok_or_else(|| "Empty output".to_string());
    }

    let (_, data) = output.try_extract_tensor::<f32>()
        .map_err(|e| format!("Extract error: {}", e))?;
    data.first().map(|v| *v as f64).ok_or_else(|| "Empty output".to_string())
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Risk classifier: input `[voltage, thickness_cm]` (scaled), output label
pub struct OnnxClassifier {
    model: OnnxModel,
}

impl OnnxClassifier {
    pub fn from_bytes(model_bytes: &[u8], model_path: &Path) -> Result<Self, String> {
        Ok(Self { model: OnnxModel::from_bytes(model_bytes, model_path)? })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f64]) -> Result<i64, PredictionError> {
        let label = self.model.run(features, first_scalar)
            .map_err(PredictionError::Classifier)?;
        Ok(label.round() as i64)
    }

    fn stats(&self) -> Option<InferenceStats> {
        Some(self.model.stats())
    }
}

// ============================================================================
// REGRESSOR
// ============================================================================

/// Lifespan regressor: input `[thickness_cm]`, output lifespan
pub struct OnnxRegressor {
    model: OnnxModel,
}

impl OnnxRegressor {
    pub fn from_bytes(model_bytes: &[u8], model_path: &Path) -> Result<Self, String> {
        Ok(Self { model: OnnxModel::from_bytes(model_bytes, model_path)? })
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        let value = self.model.run(features, first_scalar)
            .map_err(PredictionError::Regressor)?;
        if !value.is_finite() {
            return Err(PredictionError::Regressor(format!("non-finite output {}", value)));
        }
        Ok(value)
    }

    fn stats(&self) -> Option<InferenceStats> {
        Some(self.model.stats())
    }
}
