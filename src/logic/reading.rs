//! Sensor Reading - Core data structure for one acquisition cycle
//!
//! Also owns the serial line format:
//! `timestamp,<ignored>,voltage,thickness_cm,<ignored>,<ignored>`

use serde::{Deserialize, Serialize};

use crate::constants::MAX_VOLTAGE;
use super::error::MalformedReading;

/// Number of comma-separated fields in a serial record
pub const SERIAL_FIELD_COUNT: usize = 6;

const FIELD_TIMESTAMP: usize = 0;
const FIELD_VOLTAGE: usize = 2;
const FIELD_THICKNESS: usize = 3;

/// One (voltage, thickness) sample. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unix seconds
    timestamp: i64,
    /// Volts, always within [0, MAX_VOLTAGE]
    voltage: f64,
    /// Glass thickness as captured (cm)
    thickness_cm: f64,
}

impl Reading {
    /// Build a reading. Voltage is clamped into [0, 3.3]; non-finite values are rejected.
    pub fn new(timestamp: i64, voltage: f64, thickness_cm: f64) -> Option<Self> {
        if !voltage.is_finite() || !thickness_cm.is_finite() {
            return None;
        }
        Some(Self::clamped(timestamp, voltage, thickness_cm))
    }

    /// Caller guarantees both values are finite
    fn clamped(timestamp: i64, voltage: f64, thickness_cm: f64) -> Self {
        let clamped = voltage.clamp(0.0, MAX_VOLTAGE);
        if clamped != voltage {
            log::debug!("Voltage {} out of range, clamped to {}", voltage, clamped);
        }

        Self { timestamp, voltage: clamped, thickness_cm }
    }

    /// Build a reading stamped with the current time
    pub fn now(voltage: f64, thickness_cm: f64) -> Option<Self> {
        Self::new(chrono::Utc::now().timestamp(), voltage, thickness_cm)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn thickness_cm(&self) -> f64 {
        self.thickness_cm
    }

    pub fn thickness_mm(&self) -> f64 {
        self.thickness_cm * 10.0
    }

    /// Model input order: [voltage, thickness_cm]
    pub fn features(&self) -> [f64; 2] {
        [self.voltage, self.thickness_cm]
    }

    /// Voltage as a fraction of full scale (0.0 - 1.0)
    pub fn voltage_ratio(&self) -> f64 {
        (self.voltage / MAX_VOLTAGE).min(1.0)
    }
}

// ============================================================================
// SERIAL LINE PARSING
// ============================================================================

/// Parse one serial line into a Reading
pub fn parse_line(line: &str) -> Result<Reading, MalformedReading> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();

    if fields.len() != SERIAL_FIELD_COUNT {
        return Err(MalformedReading::FieldCount(fields.len()));
    }
    if fields[FIELD_TIMESTAMP] == "timestamp" {
        return Err(MalformedReading::Header);
    }

    let timestamp: i64 = parse_field(&fields, FIELD_TIMESTAMP)?;
    let voltage = parse_finite(&fields, FIELD_VOLTAGE)?;
    let thickness_cm = parse_finite(&fields, FIELD_THICKNESS)?;

    Ok(Reading::clamped(timestamp, voltage, thickness_cm))
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], index: usize) -> Result<T, MalformedReading> {
    fields[index].parse().map_err(|_| MalformedReading::BadNumber {
        index,
        value: fields[index].to_string(),
    })
}

/// Float field; NaN and infinities count as malformed
fn parse_finite(fields: &[&str], index: usize) -> Result<f64, MalformedReading> {
    let value: f64 = parse_field(fields, index)?;
    if !value.is_finite() {
        return Err(MalformedReading::BadNumber { index, value: fields[index].to_string() });
    }
    Ok(value)
}
