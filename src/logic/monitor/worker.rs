//! Monitor Worker - cancellable background acquisition loop
//!
//! The worker owns the reading source and runs on its own thread. Results go
//! into the shared history and out through a bounded channel; a full channel
//! drops the event (never blocks the worker).

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::history::{HistorySummary, PredictionHistory};
use super::pipeline::Predictor;
use super::{MonitorEvent, PredictionResult};
use crate::logic::config::MonitorConfig;
use crate::logic::error::MonitorError;
use crate::logic::model::ModelContext;
use crate::logic::sources::{ReadingSource, SourceKind, SourceStats};

/// Consecutive source errors after which the loop gives up
pub const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 10;

// ============================================================================
// STOP SIGNAL
// ============================================================================

/// Stop flag that also wakes a sleeping worker
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.cv.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep up to `timeout`; returns true if stopped
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.cv.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Summary returned when the worker exits
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub session_id: Uuid,
    pub cycles: u64,
    pub predictions: u64,
    pub prediction_failures: u64,
    pub dropped_events: u64,
    pub source_stats: SourceStats,
}

impl MonitorReport {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            cycles: 0,
            predictions: 0,
            prediction_failures: 0,
            dropped_events: 0,
            source_stats: SourceStats::default(),
        }
    }
}

// ============================================================================
// MONITOR
// ============================================================================

pub struct Monitor;

impl Monitor {
    /// Start the acquisition loop with an entropy-seeded estimator
    pub fn spawn(
        config: &MonitorConfig,
        context: ModelContext,
        source: Box<dyn ReadingSource>,
    ) -> Result<(MonitorHandle, mpsc::Receiver<MonitorEvent>), MonitorError> {
        Self::spawn_with_rng(config, context, source, StdRng::from_entropy())
    }

    /// Start the acquisition loop with a caller-supplied random source
    pub fn spawn_with_rng<R: Rng + Send + 'static>(
        config: &MonitorConfig,
        context: ModelContext,
        source: Box<dyn ReadingSource>,
        rng: R,
    ) -> Result<(MonitorHandle, mpsc::Receiver<MonitorEvent>), MonitorError> {
        let predictor = Predictor::new(context, config.risk_policy, config.lifespan_strategy, rng);
        predictor.check_ready()?;

        let session_id = Uuid::new_v4();
        let stop = Arc::new(StopSignal::new());
        let history = Arc::new(RwLock::new(PredictionHistory::new(config.history_capacity)));
        let (tx, rx) = mpsc::channel(config.channel_capacity);

        // Serial reads already block up to the port timeout
        let pace = match source.kind() {
            SourceKind::Serial => None,
            _ => Some(config.poll_interval()),
        };

        let worker = Worker {
            session_id,
            source,
            predictor,
            stop: stop.clone(),
            history: history.clone(),
            tx,
            pace,
            backoff: config.poll_interval(),
            source_errors: 0,
            report: MonitorReport::new(session_id),
        };

        let thread = std::thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || worker.run())
            .map_err(|e| MonitorError::Spawn(e.to_string()))?;

        log::info!(
            "[Monitor] Session {} started (risk: {}, poll: {}ms)",
            session_id,
            config.risk_policy.as_str(),
            config.poll_interval_ms
        );

        let handle = MonitorHandle { session_id, stop, history, thread: Some(thread) };
        Ok((handle, rx))
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Control handle for a running monitor. Dropping it stops the worker.
pub struct MonitorHandle {
    session_id: Uuid,
    stop: Arc<StopSignal>,
    history: Arc<RwLock<PredictionHistory>>,
    thread: Option<JoinHandle<MonitorReport>>,
}

impl MonitorHandle {
    /// Snapshot of the recent results, oldest first
    pub fn history(&self) -> Vec<PredictionResult> {
        self.history.read().to_vec()
    }

    pub fn latest(&self) -> Option<PredictionResult> {
        self.history.read().latest().cloned()
    }

    pub fn summary(&self) -> HistorySummary {
        self.history.read().summary()
    }

    /// Signal the worker and wait for it to exit
    pub fn stop(mut self) -> MonitorReport {
        self.stop.stop();
        self.join()
    }

    fn join(&mut self) -> MonitorReport {
        match self.thread.take().map(|t| t.join()) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                log::error!("[Monitor] Session {} worker panicked", self.session_id);
                MonitorReport::new(self.session_id)
            }
            None => MonitorReport::new(self.session_id),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

// ============================================================================
// WORKER LOOP
// ============================================================================

struct Worker<R: Rng> {
    session_id: Uuid,
    source: Box<dyn ReadingSource>,
    predictor: Predictor<R>,
    stop: Arc<StopSignal>,
    history: Arc<RwLock<PredictionHistory>>,
    tx: mpsc::Sender<MonitorEvent>,
    pace: Option<Duration>,
    /// Wait after a source error, whatever the source kind
    backoff: Duration,
    source_errors: u32,
    report: MonitorReport,
}

/// What the loop does after a cycle
enum Cycle {
    Continue,
    Backoff,
    Stop,
}

impl<R: Rng> Worker<R> {
    fn run(mut self) -> MonitorReport {
        self.publish(MonitorEvent::Started {
            session_id: self.session_id,
            source: self.source.kind(),
        });

        while !self.stop.is_stopped() {
            self.report.cycles += 1;

            let wait = match self.cycle() {
                Cycle::Stop => break,
                Cycle::Backoff => Some(self.backoff),
                Cycle::Continue => self.pace,
            };

            if let Some(interval) = wait {
                if self.stop.wait(interval) {
                    break;
                }
            }
        }

        self.report.source_stats = self.source.stats();
        log::info!(
            "[Monitor] Session {} stopped after {} cycles ({} predictions, {} failures)",
            self.session_id,
            self.report.cycles,
            self.report.predictions,
            self.report.prediction_failures
        );

        self.publish(MonitorEvent::Stopped {
            session_id: self.session_id,
            cycles: self.report.cycles,
            source_stats: self.report.source_stats.clone(),
        });
        self.report
    }

    /// One acquisition cycle
    fn cycle(&mut self) -> Cycle {
        let reading = match self.source.next_reading() {
            Ok(Some(reading)) => reading,
            Ok(None) => {
                self.source_errors = 0;
                return Cycle::Continue;
            }
            Err(e) => {
                self.source_errors += 1;
                let fatal = e.is_fatal() || self.source_errors >= MAX_CONSECUTIVE_SOURCE_ERRORS;
                if fatal {
                    log::error!(
                        "[Monitor] Session {} source failed ({} in a row): {}",
                        self.session_id,
                        self.source_errors,
                        e
                    );
                } else {
                    log::warn!("[Monitor] Session {} source error: {}", self.session_id, e);
                }
                self.publish(MonitorEvent::SourceFailed { error: e.to_string(), fatal });
                return if fatal { Cycle::Stop } else { Cycle::Backoff };
            }
        };
        self.source_errors = 0;

        match self.predictor.predict(&reading) {
            Ok(result) => {
                log::debug!(
                    "[Monitor] {:.2} V, {:.2} cm -> {} risk, {:.2} years",
                    reading.voltage(),
                    reading.thickness_cm(),
                    result.risk,
                    result.lifespan_estimate
                );
                self.history.write().push(result.clone());
                self.report.predictions += 1;
                self.publish(MonitorEvent::Prediction(result));
            }
            Err(e) => {
                log::error!("[Monitor] Error during prediction: {}", e);
                self.report.prediction_failures += 1;
                self.publish(MonitorEvent::PredictionFailed { reading, error: e.to_string() });
            }
        }
        Cycle::Continue
    }

    fn publish(&mut self, event: MonitorEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.report.dropped_events += 1;
                log::warn!("[Monitor] Event channel full - event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                log::trace!("[Monitor] No event listener");
            }
        }
    }
}
