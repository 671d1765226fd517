//! Reading Sources
//!
//! Interchangeable producers of sensor readings:
//! - `manual`: current values of the operator's controls
//! - `simulated`: pseudo-random readings
//! - `serial`: line-delimited records from a serial device (or a capture file)

pub mod manual;
pub mod serial;
pub mod simulated;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::config::MonitorConfig;
use super::error::SourceError;
use super::reading::Reading;

pub use manual::{ManualControls, ManualSource, SharedControls};
pub use serial::SerialSource;
pub use simulated::SimulatedSource;

/// Source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Manual,
    #[default]
    Simulated,
    Serial,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Manual => "manual",
            SourceKind::Simulated => "simulated",
            SourceKind::Serial => "serial",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(SourceKind::Manual),
            "simulated" | "sim" => Ok(SourceKind::Simulated),
            "serial" => Ok(SourceKind::Serial),
            other => Err(format!("unknown source: {}", other)),
        }
    }
}

/// A producer of readings, polled once per acquisition cycle
pub trait ReadingSource: Send {
    /// `Ok(None)`: nothing this cycle (timeout, discarded line)
    fn next_reading(&mut self) -> Result<Option<Reading>, SourceError>;

    fn kind(&self) -> SourceKind;

    fn stats(&self) -> SourceStats {
        SourceStats::default()
    }
}

/// Build the configured source.
///
/// A serial connect failure is returned when `serial_strict` is set;
/// otherwise the monitor falls back to the simulator.
pub fn open_source(
    config: &MonitorConfig,
    controls: SharedControls,
) -> Result<Box<dyn ReadingSource>, SourceError> {
    match config.source {
        SourceKind::Manual => Ok(Box::new(ManualSource::new(controls))),
        SourceKind::Simulated => Ok(Box::new(SimulatedSource::from_entropy())),
        SourceKind::Serial => {
            if let Some(path) = &config.replay_file {
                return Ok(Box::new(SerialSource::from_file(path)?));
            }

            let port = config.serial_port.as_deref().unwrap_or_default();
            match SerialSource::open(port, config.serial_baud, config.serial_timeout()) {
                Ok(source) => Ok(Box::new(source)),
                Err(e) if config.serial_strict => Err(e),
                Err(e) => {
                    log::warn!("[Serial] {} - falling back to simulated readings", e);
                    Ok(Box::new(SimulatedSource::from_entropy()))
                }
            }
        }
    }
}

/// Counters for a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub readings: u64,
    pub discarded: u64,
    pub timeouts: u64,
}

/// Lock-free counters shared by source implementations
#[derive(Debug, Default)]
pub(crate) struct SourceCounters {
    readings: AtomicU64,
    discarded: AtomicU64,
    timeouts: AtomicU64,
}

impl SourceCounters {
    pub fn reading(&self) {
        self.readings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SourceStats {
        SourceStats {
            readings: self.readings.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use parking_lot::RwLock;

    fn controls() -> SharedControls {
        Arc::new(RwLock::new(ManualControls::default()))
    }

    #[test]
    fn test_open_manual_and_simulated() {
        let config = MonitorConfig { source: SourceKind::Manual, ..Default::default() };
        assert_eq!(open_source(&config, controls()).unwrap().kind(), SourceKind::Manual);

        let config = MonitorConfig { source: SourceKind::Simulated, ..Default::default() };
        assert_eq!(open_source(&config, controls()).unwrap().kind(), SourceKind::Simulated);
    }

    #[test]
    fn test_serial_strict_is_fatal() {
        let config = MonitorConfig {
            source: SourceKind::Serial,
            serial_port: Some("/dev/definitely-not-a-port".to_string()),
            serial_strict: true,
            ..Default::default()
        };
        let err = open_source(&config, controls()).err().unwrap();
        assert!(matches!(err, SourceError::SerialConnect { .. }));
    }

    #[test]
    fn test_serial_lenient_falls_back() {
        let config = MonitorConfig {
            source: SourceKind::Serial,
            serial_port: Some("/dev/definitely-not-a-port".to_string()),
            ..Default::default()
        };
        let source = open_source(&config, controls()).unwrap();
        assert_eq!(source.kind(), SourceKind::Simulated);
    }

    #[test]
    fn test_replay_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");
        std::fs::write(&path, "1700000000,0,1.65,0.4,0,0\n").unwrap();

        let config = MonitorConfig {
            source: SourceKind::Serial,
            replay_file: Some(path),
            ..Default::default()
        };
        let mut source = open_source(&config, controls()).unwrap();
        let reading = source.next_reading().unwrap().unwrap();
        assert_eq!(reading.voltage(), 1.65);
    }
}
