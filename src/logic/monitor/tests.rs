//! Integration Tests for the acquisition loop
//!
//! Drive the worker end-to-end with in-memory serial streams and stub models.

use std::io::{BufReader, Cursor, ErrorKind, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::mock::StepRng;
use tokio::sync::mpsc::Receiver;

use super::worker::MAX_CONSECUTIVE_SOURCE_ERRORS;
use super::{Monitor, MonitorEvent, RiskMethod};
use crate::logic::config::MonitorConfig;
use crate::logic::error::{MonitorError, PredictionError};
use crate::logic::model::{Classifier, ModelContext, Scaler};
use crate::logic::risk::{RiskLevel, RiskPolicy};
use crate::logic::sources::{SerialSource, SimulatedSource};

struct Identity;
impl Scaler for Identity {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        Ok(features.to_vec())
    }
}

struct AlwaysLow;
impl Classifier for AlwaysLow {
    fn predict(&self, _: &[f64]) -> Result<i64, PredictionError> {
        Ok(0)
    }
}

struct Broken;
impl Classifier for Broken {
    fn predict(&self, _: &[f64]) -> Result<i64, PredictionError> {
        Err(PredictionError::Classifier("model exploded".to_string()))
    }
}

/// Unplugged device: every read fails
struct UnpluggedPort;
impl Read for UnpluggedPort {
    fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(ErrorKind::BrokenPipe, "device disconnected"))
    }
}

fn unplugged_serial() -> Box<SerialSource<BufReader<UnpluggedPort>>> {
    Box::new(SerialSource::new(BufReader::new(UnpluggedPort)))
}

fn serial_lines(lines: &[String]) -> Box<SerialSource<Cursor<Vec<u8>>>> {
    let data = lines.join("\n") + "\n";
    Box::new(SerialSource::new(Cursor::new(data.into_bytes())))
}

fn rule_config() -> MonitorConfig {
    MonitorConfig { risk_policy: RiskPolicy::Rule, ..Default::default() }
}

fn drain(rx: &mut Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.blocking_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_replay_fills_bounded_history() {
    let mut lines = vec!["timestamp,a,voltage,thickness,b,c".to_string()];
    for i in 0..12 {
        lines.push(format!("{},0,1.0,0.4,0,0", 1700000000 + i));
    }
    lines.push("garbage".to_string());

    let (handle, mut rx) = Monitor::spawn_with_rng(
        &rule_config(), ModelContext::empty(), serial_lines(&lines), StepRng::new(0, 0),
    ).unwrap();

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(MonitorEvent::Started { .. })));
    assert!(matches!(events.last(), Some(MonitorEvent::Stopped { .. })));

    let predictions: Vec<_> = events.iter()
        .filter_map(|e| match e {
            MonitorEvent::Prediction(result) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(predictions.len(), 12);
    assert!(predictions.iter().all(|r| r.risk == RiskLevel::Low));
    // 4 mm -> band minimum 20 years, decay 20 * (1.0 / 3.3) * 0.05
    let expected = 20.0 - 20.0 * (1.0 / 3.3) * 0.05;
    assert!((predictions[0].lifespan_estimate - expected).abs() < 1e-9);

    let history = handle.history();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].reading.timestamp(), 1700000002);
    assert_eq!(history[9].reading.timestamp(), 1700000011);

    let report = handle.stop();
    assert_eq!(report.predictions, 12);
    assert_eq!(report.source_stats.discarded, 2);
}

#[test]
fn test_prediction_errors_do_not_stop_loop() {
    let lines: Vec<String> = (0..3).map(|i| format!("{},0,1.0,0.4,0,0", i)).collect();
    let context = ModelContext::empty()
        .with_scaler(Arc::new(Identity))
        .with_classifier(Arc::new(Broken));
    let config = MonitorConfig { risk_policy: RiskPolicy::Model, ..Default::default() };

    let (handle, mut rx) = Monitor::spawn_with_rng(
        &config, context, serial_lines(&lines), StepRng::new(0, 0),
    ).unwrap();

    let events = drain(&mut rx);
    let failures = events.iter()
        .filter(|e| matches!(e, MonitorEvent::PredictionFailed { .. }))
        .count();
    assert_eq!(failures, 3);
    assert!(handle.history().is_empty());

    let report = handle.stop();
    assert_eq!(report.prediction_failures, 3);
}

#[test]
fn test_override_applies_in_loop() {
    let lines = vec!["1700000000,0,2.6,0.5,0,0".to_string()];
    let context = ModelContext::empty()
        .with_scaler(Arc::new(Identity))
        .with_classifier(Arc::new(AlwaysLow));
    let config = MonitorConfig { risk_policy: RiskPolicy::ModelWithOverride, ..Default::default() };

    let (handle, mut rx) = Monitor::spawn_with_rng(
        &config, context, serial_lines(&lines), StepRng::new(0, 0),
    ).unwrap();
    drain(&mut rx);

    let latest = handle.latest().unwrap();
    assert_eq!(latest.risk, RiskLevel::High);
    assert_eq!(latest.risk_method, RiskMethod::Override);
}

#[test]
fn test_model_policy_requires_models() {
    let config = MonitorConfig { risk_policy: RiskPolicy::Model, ..Default::default() };
    let result = Monitor::spawn(&config, ModelContext::empty(), Box::new(SimulatedSource::seeded(1)));

    assert!(matches!(
        result,
        Err(MonitorError::Prediction(PredictionError::ModelsUnavailable(_)))
    ));
}

#[test]
fn test_stop_interrupts_poll_wait() {
    let config = MonitorConfig {
        risk_policy: RiskPolicy::Rule,
        poll_interval_ms: 10_000,
        ..Default::default()
    };
    let (handle, mut rx) = Monitor::spawn(
        &config, ModelContext::empty(), Box::new(SimulatedSource::seeded(2)),
    ).unwrap();

    // Started + first prediction arrive before the long wait
    assert!(matches!(rx.blocking_recv(), Some(MonitorEvent::Started { .. })));
    assert!(matches!(rx.blocking_recv(), Some(MonitorEvent::Prediction(_))));

    let started = Instant::now();
    let report = handle.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.cycles, 1);

    assert!(matches!(rx.blocking_recv(), Some(MonitorEvent::Stopped { .. })));
    assert!(rx.blocking_recv().is_none());
}

#[test]
fn test_source_errors_back_off() {
    let config = MonitorConfig { risk_policy: RiskPolicy::Rule, poll_interval_ms: 50, ..Default::default() };
    let (handle, _rx) = Monitor::spawn_with_rng(
        &config, ModelContext::empty(), unplugged_serial(), StepRng::new(0, 0),
    ).unwrap();

    std::thread::sleep(Duration::from_millis(200));
    let report = handle.stop();

    // One read per 50 ms backoff, not a busy loop
    assert!(report.cycles >= 1);
    assert!(report.cycles <= 8, "cycles: {}", report.cycles);
    assert_eq!(report.predictions, 0);
}

#[test]
fn test_repeated_source_errors_end_loop() {
    let config = MonitorConfig { risk_policy: RiskPolicy::Rule, poll_interval_ms: 50, ..Default::default() };
    let (handle, mut rx) = Monitor::spawn_with_rng(
        &config, ModelContext::empty(), unplugged_serial(), StepRng::new(0, 0),
    ).unwrap();

    let events = drain(&mut rx);
    let failures: Vec<bool> = events.iter()
        .filter_map(|e| match e {
            MonitorEvent::SourceFailed { fatal, .. } => Some(*fatal),
            _ => None,
        })
        .collect();

    assert_eq!(failures.len(), MAX_CONSECUTIVE_SOURCE_ERRORS as usize);
    assert_eq!(failures.iter().filter(|fatal| **fatal).count(), 1);
    assert_eq!(failures.last(), Some(&true));
    assert!(matches!(events.last(), Some(MonitorEvent::Stopped { .. })));

    let report = handle.stop();
    assert_eq!(report.cycles, MAX_CONSECUTIVE_SOURCE_ERRORS as u64);
}
