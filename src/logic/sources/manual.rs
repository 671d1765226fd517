//! Manual Source - operator-controlled values
//!
//! The presentation layer writes the controls; the worker reads the current
//! values each cycle.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{ReadingSource, SourceCounters, SourceKind, SourceStats};
use crate::constants::{
    DEFAULT_THICKNESS_CM, DEFAULT_VOLTAGE, MAX_THICKNESS_CM, MAX_VOLTAGE, MIN_THICKNESS_CM,
};
use crate::logic::error::SourceError;
use crate::logic::reading::Reading;

/// Voltage slider + thickness input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualControls {
    voltage: f64,
    thickness_cm: f64,
}

impl Default for ManualControls {
    fn default() -> Self {
        Self { voltage: DEFAULT_VOLTAGE, thickness_cm: DEFAULT_THICKNESS_CM }
    }
}

impl ManualControls {
    /// Values are clamped to the control ranges
    pub fn new(voltage: f64, thickness_cm: f64) -> Self {
        let mut controls = Self::default();
        controls.set(voltage, thickness_cm);
        controls
    }

    /// Non-finite values leave the current value untouched
    pub fn set(&mut self, voltage: f64, thickness_cm: f64) {
        if voltage.is_finite() {
            self.voltage = voltage.clamp(0.0, MAX_VOLTAGE);
        }
        if thickness_cm.is_finite() {
            self.thickness_cm = thickness_cm.clamp(MIN_THICKNESS_CM, MAX_THICKNESS_CM);
        }
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn thickness_cm(&self) -> f64 {
        self.thickness_cm
    }
}

/// Controls shared between presentation layer and worker
pub type SharedControls = Arc<RwLock<ManualControls>>;

pub struct ManualSource {
    controls: SharedControls,
    counters: SourceCounters,
}

impl ManualSource {
    pub fn new(controls: SharedControls) -> Self {
        Self { controls, counters: SourceCounters::default() }
    }
}

impl ReadingSource for ManualSource {
    fn next_reading(&mut self) -> Result<Option<Reading>, SourceError> {
        let controls = *self.controls.read();
        let reading = Reading::now(controls.voltage(), controls.thickness_cm());
        if reading.is_some() {
            self.counters.reading();
        }
        Ok(reading)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Manual
    }

    fn stats(&self) -> SourceStats {
        self.counters.snapshot()
    }
}
