//! Microfracture Monitor - Main Entry Point
//!
//! Console front-end: loads config and models, starts the acquisition worker,
//! then renders its events and handles operator commands until `quit` or Ctrl-C.

mod api;
mod logic;
pub mod constants;

use std::process::ExitCode;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use api::commands::{self, Command};
use api::engine_status::EngineStatus;
use logic::config::MonitorConfig;
use logic::error::MonitorError;
use logic::model::ModelContext;
use logic::monitor::{Monitor, MonitorEvent, MonitorHandle};
use logic::sources::{self, ManualControls, SharedControls, SourceKind};

/// Everything the console needs once the worker is running
struct Session {
    config: MonitorConfig,
    context: ModelContext,
    controls: SharedControls,
    handle: MonitorHandle,
    events: mpsc::Receiver<MonitorEvent>,
}

fn start() -> Result<Session, MonitorError> {
    let config = MonitorConfig::load()?;

    log::info!("Model dir: {}", config.model_dir.display());
    let context = ModelContext::load(&config.artifact_paths());
    if !context.has_classification() {
        log::info!("Classifier not available - rule-based risk only");
    }

    let controls: SharedControls = Arc::new(RwLock::new(ManualControls::default()));
    let source = sources::open_source(&config, controls.clone())?;
    let (handle, events) = Monitor::spawn(&config, context.clone(), source)?;

    Ok(Session { config, context, controls, handle, events })
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let Session { config, context, controls, handle, mut events } = match start() {
        Ok(session) => session,
        Err(e) => {
            log::error!("Failed to start monitor: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.source == SourceKind::Manual {
        println!("{}", commands::help_text());
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(line) = commands::render_event(&event) {
                        println!("{}", line);
                    }
                }
                None => break,
            },
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if !handle_command(&line, &config, &context, &controls, &handle) {
                        break;
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted - stopping monitor");
                break;
            }
        }
    }

    let report = match tokio::task::spawn_blocking(move || handle.stop()).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Monitor shutdown failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Session {} finished: {} cycles, {} predictions, {} failures, {} dropped events",
        report.session_id,
        report.cycles,
        report.predictions,
        report.prediction_failures,
        report.dropped_events
    );
    ExitCode::SUCCESS
}

/// Handle one operator command; false means quit
fn handle_command(
    line: &str,
    config: &MonitorConfig,
    context: &ModelContext,
    controls: &SharedControls,
    handle: &MonitorHandle,
) -> bool {
    match commands::parse_command(line) {
        Ok(Command::Set { voltage, thickness_cm }) => {
            if config.source != SourceKind::Manual {
                println!("Controls only apply to the manual source");
                return true;
            }
            let (voltage, thickness_cm) = commands::apply_set(controls, voltage, thickness_cm);
            println!("Controls set: {:.2} V, {:.2} cm", voltage, thickness_cm);
        }
        Ok(Command::History) => {
            println!("{}", commands::render_history(&handle.history(), &handle.summary()));
        }
        Ok(Command::Status) => {
            println!("{}", EngineStatus::collect(config, context, handle.summary()).render());
        }
        Ok(Command::Help) => println!("{}", commands::help_text()),
        Ok(Command::Quit) => return false,
        Err(e) => println!("{}", e),
    }
    true
}
