//! Lifespan Estimator
//!
//! Rule-based remaining lifespan (years) from glass thickness and piezo voltage.
//!
//! Estimates are intentionally stochastic: each band samples uniformly within
//! its range, so two calls with the same inputs return different values.
//! Callers inject the random source; tests pass a deterministic one.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_VOLTAGE;

/// Lifespan used when thickness falls outside every band
pub const FALLBACK_LIFESPAN: f64 = 15.0;

/// Fraction of lifespan lost at full-scale voltage
pub const VOLTAGE_DECAY_RATE: f64 = 0.05;

/// Thickness band (mm) with its lifespan range (years)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifespanBand {
    pub lower_mm: f64,
    pub upper_mm: f64,
    /// Upper bound included (only the last band)
    pub upper_inclusive: bool,
    pub min_years: f64,
    pub max_years: f64,
}

impl LifespanBand {
    const fn new(lower_mm: f64, upper_mm: f64, upper_inclusive: bool, min_years: f64, max_years: f64) -> Self {
        Self { lower_mm, upper_mm, upper_inclusive, min_years, max_years }
    }

    pub fn contains(&self, thickness_mm: f64) -> bool {
        if thickness_mm < self.lower_mm {
            return false;
        }
        if self.upper_inclusive {
            thickness_mm <= self.upper_mm
        } else {
            thickness_mm < self.upper_mm
        }
    }

    /// Uniform sample in [min_years, max_years)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min_years..self.max_years)
    }
}

/// Checked in order, first match wins
pub const LIFESPAN_BANDS: [LifespanBand; 5] = [
    LifespanBand::new(2.0, 3.0, false, 10.0, 20.0),
    LifespanBand::new(3.0, 6.38, false, 20.0, 30.0),
    LifespanBand::new(6.38, 20.0, false, 30.0, 50.0),
    LifespanBand::new(20.0, 40.0, false, 15.0, 25.0),
    LifespanBand::new(40.0, 75.0, true, 20.0, 25.0),
];

/// Find the band covering a thickness, if any
pub fn band_for(thickness_mm: f64) -> Option<&'static LifespanBand> {
    LIFESPAN_BANDS.iter().find(|band| band.contains(thickness_mm))
}

/// Pre-decay lifespan sample
pub fn base_lifespan<R: Rng + ?Sized>(thickness_mm: f64, rng: &mut R) -> f64 {
    match band_for(thickness_mm) {
        Some(band) => band.sample(rng),
        None => FALLBACK_LIFESPAN,
    }
}

/// Reduce lifespan proportionally to voltage; never below zero
pub fn apply_voltage_decay(lifespan: f64, voltage: f64) -> f64 {
    let decay = lifespan * (voltage / MAX_VOLTAGE) * VOLTAGE_DECAY_RATE;
    (lifespan - decay).max(0.0)
}

/// Estimated remaining lifespan in years
pub fn estimate_lifespan<R: Rng + ?Sized>(thickness_mm: f64, voltage: f64, rng: &mut R) -> f64 {
    apply_voltage_decay(base_lifespan(thickness_mm, rng), voltage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zero_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    #[test]
    fn test_thin_band_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..500 {
            let thickness = 2.0 + (i as f64 / 500.0);
            let base = base_lifespan(thickness, &mut rng);
            assert!((10.0..20.0).contains(&base), "base {} out of range", base);

            let decayed = estimate_lifespan(thickness, 3.3, &mut rng);
            assert!((0.0..20.0).contains(&decayed), "decayed {} out of range", decayed);
        }
    }

    #[test]
    fn test_out_of_band_fallback() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(base_lifespan(1.0, &mut rng), FALLBACK_LIFESPAN);
        assert_eq!(base_lifespan(100.0, &mut rng), FALLBACK_LIFESPAN);
        assert_eq!(estimate_lifespan(100.0, 0.0, &mut rng), 15.0);
    }

    #[test]
    fn test_zero_voltage_no_decay() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let base = base_lifespan(10.0, &mut a);
        let result = estimate_lifespan(10.0, 0.0, &mut b);
        assert_eq!(base, result);
    }

    #[test]
    fn test_full_voltage_decay() {
        // Zero rng samples the band minimum
        let result = estimate_lifespan(2.5, 3.3, &mut zero_rng());
        assert!((result - 10.0 * 0.95).abs() < 1e-9);

        let result = estimate_lifespan(1.0, 3.3, &mut zero_rng());
        assert!((result - 15.0 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_band_boundaries() {
        let mut rng = zero_rng();
        assert_eq!(base_lifespan(1.999, &mut rng), 15.0);
        assert_eq!(base_lifespan(2.0, &mut rng), 10.0);
        assert_eq!(base_lifespan(3.0, &mut rng), 20.0);
        assert_eq!(base_lifespan(6.38, &mut rng), 30.0);
        assert_eq!(base_lifespan(6.8, &mut rng), 30.0);
        assert_eq!(base_lifespan(20.0, &mut rng), 15.0);
        assert_eq!(base_lifespan(40.0, &mut rng), 20.0);
        assert_eq!(base_lifespan(75.0, &mut rng), 20.0);
        assert_eq!(base_lifespan(75.001, &mut rng), 15.0);
    }

    #[test]
    fn test_never_negative() {
        let mut rng = StdRng::seed_from_u64(3);
        for band in LIFESPAN_BANDS.iter() {
            for step in 0..=10 {
                let voltage = step as f64 * 0.33;
                let result = estimate_lifespan(band.lower_mm, voltage, &mut rng);
                assert!(result >= 0.0);
            }
        }
        // Far outside the sensor range still clamps
        assert_eq!(apply_voltage_decay(10.0, 1000.0), 0.0);
    }

    #[test]
    fn test_stochastic_between_calls() {
        let mut rng = StdRng::seed_from_u64(9);
        let first = estimate_lifespan(10.0, 1.0, &mut rng);
        let second = estimate_lifespan(10.0, 1.0, &mut rng);
        assert_ne!(first, second);
    }
}
