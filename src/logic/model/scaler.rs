//! Scaler - Normalization parameters từ training
//!
//! Parameters are exported from the training pipeline as JSON:
//! `{"kind":"standard","mean":[..],"scale":[..]}` or
//! `{"kind":"min_max","data_min":[..],"data_max":[..]}`.

use serde::{Deserialize, Serialize};

use super::Scaler;
use crate::logic::error::PredictionError;

/// Minimum divisor, avoids division by zero on constant features
const MIN_RANGE: f64 = 1e-8;

/// Scaler parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// (x - mean) / scale
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// (x - min) / (max - min)
    MinMax { data_min: Vec<f64>, data_max: Vec<f64> },
}

impl ScalerParams {
    pub fn feature_count(&self) -> usize {
        match self {
            ScalerParams::Standard { mean, .. } => mean.len(),
            ScalerParams::MinMax { data_min, .. } => data_min.len(),
        }
    }

    /// Both vectors must have the same non-zero length
    pub fn validate(&self) -> Result<(), String> {
        let (a, b) = match self {
            ScalerParams::Standard { mean, scale } => (mean.len(), scale.len()),
            ScalerParams::MinMax { data_min, data_max } => (data_min.len(), data_max.len()),
        };
        if a == 0 {
            return Err("scaler has no features".to_string());
        }
        if a != b {
            return Err(format!("parameter length mismatch: {} vs {}", a, b));
        }
        Ok(())
    }
}

/// Scaler backed by JSON parameters
#[derive(Debug, Clone)]
pub struct JsonScaler {
    params: ScalerParams,
}

impl JsonScaler {
    pub fn new(params: ScalerParams) -> Result<Self, String> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let params: ScalerParams = serde_json::from_str(content).map_err(|e| e.to_string())?;
        Self::new(params)
    }
}

impl Scaler for JsonScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let expected = self.params.feature_count();
        if features.len() != expected {
            return Err(PredictionError::FeatureMismatch { expected, actual: features.len() });
        }

        let scaled: Vec<f64> = match &self.params {
            ScalerParams::Standard { mean, scale } => features
                .iter()
                .zip(mean.iter().zip(scale.iter()))
                .map(|(x, (m, s))| (x - m) / nonzero(*s))
                .collect(),
            ScalerParams::MinMax { data_min, data_max } => features
                .iter()
                .zip(data_min.iter().zip(data_max.iter()))
                .map(|(x, (lo, hi))| (x - lo) / nonzero(hi - lo))
                .collect(),
        };

        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(PredictionError::Scaler("non-finite scaled value".to_string()));
        }
        Ok(scaled)
    }
}

fn nonzero(v: f64) -> f64 {
    if v.abs() < MIN_RANGE {
        MIN_RANGE.copysign(v)
    } else {
        v
    }
}
