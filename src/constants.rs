//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden from the environment (or a `.env` file).

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Microfracture Monitor";

/// Directory name under the local data dir holding model artifacts
pub const APP_DIR_NAME: &str = "microfracture-monitor";

/// Unit of every lifespan estimate produced by this service
pub const LIFESPAN_UNIT: &str = "years";

/// Upper bound of the piezo sensor voltage (V)
pub const MAX_VOLTAGE: f64 = 3.3;

/// Manual thickness input bounds (cm)
pub const MIN_THICKNESS_CM: f64 = 0.1;
pub const MAX_THICKNESS_CM: f64 = 2.0;

/// Manual control defaults
pub const DEFAULT_VOLTAGE: f64 = 0.1;
pub const DEFAULT_THICKNESS_CM: f64 = 0.4;

/// Default poll interval between acquisition cycles (ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Number of recent results kept in memory
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Bounded channel size between worker and presentation layer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Serial defaults
pub const DEFAULT_SERIAL_BAUD: u32 = 9600;
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 1000;

/// Artifact file names
pub const DEFAULT_CLASSIFIER_FILE: &str = "fracture_classifier.onnx";
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";
pub const DEFAULT_REGRESSOR_FILE: &str = "lifespan_regressor.onnx";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get a string setting from environment
pub fn get_env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Get a parsed setting from environment or use default
pub fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Get a boolean flag from environment or use default
pub fn get_env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|s| {
            let s = s.trim().to_lowercase();
            s != "false" && s != "0" && s != "no"
        })
        .unwrap_or(default)
}

/// Default model directory (`<local data dir>/microfracture-monitor/models`)
pub fn get_default_model_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("models")
}
