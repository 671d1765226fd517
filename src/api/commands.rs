//! Console Commands - operator input and result rendering
//!
//! The console is the presentation layer: it never computes predictions, it
//! only formats `MonitorEvent`s and updates the manual controls.

use chrono::{TimeZone, Utc};

use crate::constants::LIFESPAN_UNIT;
use crate::logic::monitor::{HistorySummary, MonitorEvent, PredictionResult};
use crate::logic::sources::SharedControls;

/// Width of the voltage bar
const BAR_WIDTH: usize = 20;

// ============================================================================
// COMMANDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Update manual controls
    Set { voltage: f64, thickness_cm: f64 },
    History,
    Status,
    Help,
    Quit,
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    match parts.as_slice() {
        ["set", voltage, thickness] => {
            let voltage: f64 = voltage.parse()
                .map_err(|_| format!("Invalid voltage: {}", voltage))?;
            let thickness_cm: f64 = thickness.parse()
                .map_err(|_| format!("Invalid thickness: {}", thickness))?;
            Ok(Command::Set { voltage, thickness_cm })
        }
        ["set", ..] => Err("Usage: set <voltage> <thickness_cm>".to_string()),
        ["history"] => Ok(Command::History),
        ["status"] => Ok(Command::Status),
        ["help"] | ["?"] => Ok(Command::Help),
        ["quit"] | ["exit"] | ["q"] => Ok(Command::Quit),
        [] => Err("Empty command".to_string()),
        [other, ..] => Err(format!("Unknown command: {} (try 'help')", other)),
    }
}

/// Apply a `set` command to the shared controls; returns the clamped values
pub fn apply_set(controls: &SharedControls, voltage: f64, thickness_cm: f64) -> (f64, f64) {
    let mut guard = controls.write();
    guard.set(voltage, thickness_cm);
    (guard.voltage(), guard.thickness_cm())
}

pub fn help_text() -> &'static str {
    "Commands:\n  \
     set <voltage> <thickness_cm>  Update manual controls\n  \
     history                       Show recent results\n  \
     status                        Show model status\n  \
     quit                          Stop monitoring"
}

// ============================================================================
// RENDERING
// ============================================================================

fn voltage_bar(ratio: f64) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * BAR_WIDTH as f64).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

pub fn render_result(result: &PredictionResult) -> String {
    let reading = &result.reading;
    format!(
        "{} | Voltage: {:.2} V {} | Thickness: {:.2} cm | Risk: {} | Lifespan: {:.2} {}",
        format_timestamp(reading.timestamp()),
        reading.voltage(),
        voltage_bar(reading.voltage_ratio()),
        reading.thickness_cm(),
        result.risk,
        result.lifespan_estimate,
        LIFESPAN_UNIT
    )
}

/// One console line per event; `None` for events not shown
pub fn render_event(event: &MonitorEvent) -> Option<String> {
    match event {
        MonitorEvent::Started { session_id, source } => {
            Some(format!("Monitoring started ({} source, session {})", source.as_str(), session_id))
        }
        MonitorEvent::Prediction(result) => Some(render_result(result)),
        MonitorEvent::PredictionFailed { error, .. } => {
            Some(format!("Error during prediction: {}", error))
        }
        MonitorEvent::SourceFailed { error, fatal: true } => {
            Some(format!("Sensor input lost: {}", error))
        }
        MonitorEvent::SourceFailed { .. } => None,
        MonitorEvent::Stopped { cycles, source_stats, .. } => Some(format!(
            "Monitoring stopped after {} cycles ({} readings, {} discarded)",
            cycles, source_stats.readings, source_stats.discarded
        )),
    }
}

pub fn render_history(history: &[PredictionResult], summary: &HistorySummary) -> String {
    if history.is_empty() {
        return "No results yet".to_string();
    }

    let mut out: Vec<String> = history.iter().map(render_result).collect();
    out.push(format!(
        "{} of last {} high risk | mean lifespan {:.2} {} | min {:.2} {}",
        summary.high_risk_count,
        summary.size,
        summary.mean_lifespan,
        LIFESPAN_UNIT,
        summary.min_lifespan,
        LIFESPAN_UNIT
    ));
    out.join("\n")
}
