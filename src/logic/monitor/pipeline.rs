//! Prediction Pipeline
//!
//! Reading -> risk (classifier and/or rule) + lifespan (estimator or regressor).
//! Stateless apart from the random source used for lifespan jitter.

use rand::Rng;

use super::{LifespanMethod, PredictionResult, RiskMethod};
use crate::logic::config::LifespanStrategy;
use crate::logic::error::PredictionError;
use crate::logic::lifespan::estimate_lifespan;
use crate::logic::model::ModelContext;
use crate::logic::reading::Reading;
use crate::logic::risk::{rule_risk, with_override, RiskLevel, RiskPolicy};

/// Per-cycle prediction with fixed policy
pub struct Predictor<R: Rng> {
    context: ModelContext,
    risk_policy: RiskPolicy,
    lifespan_strategy: LifespanStrategy,
    rng: R,
}

impl<R: Rng> Predictor<R> {
    pub fn new(
        context: ModelContext,
        risk_policy: RiskPolicy,
        lifespan_strategy: LifespanStrategy,
        rng: R,
    ) -> Self {
        if lifespan_strategy == LifespanStrategy::Regressor && context.regressor().is_none() {
            log::warn!("[Monitor] Regressor not loaded - using rule-based lifespan");
        }
        Self { context, risk_policy, lifespan_strategy, rng }
    }

    /// Models required by the risk policy are present
    pub fn check_ready(&self) -> Result<(), PredictionError> {
        if self.risk_policy.needs_models() {
            self.context.require_classification()?;
        }
        Ok(())
    }

    pub fn predict(&mut self, reading: &Reading) -> Result<PredictionResult, PredictionError> {
        let (risk, risk_method) = self.classify(reading)?;
        let (lifespan_estimate, lifespan_method) = self.lifespan(reading)?;

        Ok(PredictionResult {
            reading: *reading,
            risk,
            lifespan_estimate,
            risk_method,
            lifespan_method,
        })
    }

    fn classify(&self, reading: &Reading) -> Result<(RiskLevel, RiskMethod), PredictionError> {
        match self.risk_policy {
            RiskPolicy::Rule => Ok((rule_risk(reading), RiskMethod::Rule)),
            RiskPolicy::Model => Ok((self.model_risk(reading)?, RiskMethod::Model)),
            RiskPolicy::ModelWithOverride => {
                let model = self.model_risk(reading)?;
                let combined = with_override(model, reading);
                let method = if combined != model { RiskMethod::Override } else { RiskMethod::Model };
                Ok((combined, method))
            }
        }
    }

    fn model_risk(&self, reading: &Reading) -> Result<RiskLevel, PredictionError> {
        let models = self.context.require_classification()?;
        let scaled = models.scaler.transform(&reading.features())?;
        let label = models.classifier.predict(&scaled)?;
        Ok(RiskLevel::from_label(label))
    }

    fn lifespan(&mut self, reading: &Reading) -> Result<(f64, LifespanMethod), PredictionError> {
        if self.lifespan_strategy == LifespanStrategy::Regressor {
            if let Some(regressor) = self.context.regressor() {
                let value = regressor.predict(&[reading.thickness_cm()])?;
                return Ok((value.max(0.0), LifespanMethod::Regressor));
            }
        }

        let value = estimate_lifespan(reading.thickness_mm(), reading.voltage(), &mut self.rng);
        Ok((value, LifespanMethod::Rule))
    }
}
