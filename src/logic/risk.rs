//! Risk Classification
//!
//! Microfracture risk from a reading: via the trained classifier, via the
//! threshold rule, or classifier with the rule forcing `High`.

use serde::{Deserialize, Serialize};

use super::reading::Reading;

/// Voltage above which the rule reports High risk (V)
pub const RULE_VOLTAGE_THRESHOLD: f64 = 2.5;

/// Thickness below which the rule reports High risk (cm)
pub const RULE_THICKNESS_THRESHOLD_CM: f64 = 0.3;

/// Classifier label meaning High risk
pub const HIGH_RISK_LABEL: i64 = 1;

/// Risk levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn from_label(label: i64) -> Self {
        if label == HIGH_RISK_LABEL {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::High => "High",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, RiskLevel::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How risk is decided each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskPolicy {
    /// Scaler + classifier
    #[default]
    Model,
    /// Threshold rule only, no models needed
    Rule,
    /// Classifier, forced to High when the rule fires
    ModelWithOverride,
}

impl RiskPolicy {
    pub fn needs_models(&self) -> bool {
        !matches!(self, RiskPolicy::Rule)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskPolicy::Model => "model",
            RiskPolicy::Rule => "rule",
            RiskPolicy::ModelWithOverride => "model_with_override",
        }
    }
}

impl std::str::FromStr for RiskPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" => Ok(RiskPolicy::Model),
            "rule" | "manual" => Ok(RiskPolicy::Rule),
            "model_with_override" | "override" => Ok(RiskPolicy::ModelWithOverride),
            other => Err(format!("unknown risk policy: {}", other)),
        }
    }
}

/// Threshold rule: High if voltage > 2.5 or thickness_cm < 0.3
pub fn rule_risk(reading: &Reading) -> RiskLevel {
    if reading.voltage() > RULE_VOLTAGE_THRESHOLD
        || reading.thickness_cm() < RULE_THICKNESS_THRESHOLD_CM
    {
        RiskLevel::High
    } else {
        RiskLevel::Low
    }
}

/// Combine classifier output with the rule
pub fn with_override(model_risk: RiskLevel, reading: &Reading) -> RiskLevel {
    if rule_risk(reading).is_high() {
        RiskLevel::High
    } else {
        model_risk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(voltage: f64, thickness_cm: f64) -> Reading {
        Reading::new(0, voltage, thickness_cm).unwrap()
    }

    #[test]
    fn test_rule_high_voltage() {
        assert_eq!(rule_risk(&reading(2.6, 0.5)), RiskLevel::High);
    }

    #[test]
    fn test_rule_thin_glass() {
        assert_eq!(rule_risk(&reading(1.0, 0.2)), RiskLevel::High);
    }

    #[test]
    fn test_rule_boundaries_are_low() {
        assert_eq!(rule_risk(&reading(2.5, 0.3)), RiskLevel::Low);
    }

    #[test]
    fn test_override_ignores_classifier() {
        assert_eq!(with_override(RiskLevel::Low, &reading(2.6, 0.5)), RiskLevel::High);
        assert_eq!(with_override(RiskLevel::High, &reading(1.0, 0.5)), RiskLevel::High);
        assert_eq!(with_override(RiskLevel::Low, &reading(1.0, 0.5)), RiskLevel::Low);
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(RiskLevel::from_label(1), RiskLevel::High);
        assert_eq!(RiskLevel::from_label(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_label(2), RiskLevel::Low);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("rule".parse::<RiskPolicy>(), Ok(RiskPolicy::Rule));
        assert_eq!("Model".parse::<RiskPolicy>(), Ok(RiskPolicy::Model));
        assert!("bogus".parse::<RiskPolicy>().is_err());
        assert!(!RiskPolicy::Rule.needs_models());
    }
}
