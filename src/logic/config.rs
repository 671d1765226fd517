//! Monitor Configuration
//!
//! Built from environment variables (see `constants.rs` for defaults) or from
//! a JSON file named by `MONITOR_CONFIG`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    get_default_model_dir, get_env_flag, get_env_parsed, get_env_string,
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CLASSIFIER_FILE, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REGRESSOR_FILE, DEFAULT_SCALER_FILE, DEFAULT_SERIAL_BAUD,
    DEFAULT_SERIAL_TIMEOUT_MS,
};
use super::error::ConfigError;
use super::model::ArtifactPaths;
use super::risk::RiskPolicy;
use super::sources::SourceKind;

const MIN_POLL_INTERVAL_MS: u64 = 50;
const MAX_POLL_INTERVAL_MS: u64 = 10_000;

/// Where the lifespan estimate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifespanStrategy {
    /// Banded estimator with jitter and voltage decay
    #[default]
    Rule,
    /// Trained regressor (falls back to Rule if not loaded)
    Regressor,
}

impl LifespanStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifespanStrategy::Rule => "rule",
            LifespanStrategy::Regressor => "regressor",
        }
    }
}

impl std::str::FromStr for LifespanStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rule" => Ok(LifespanStrategy::Rule),
            "regressor" | "model" => Ok(LifespanStrategy::Regressor),
            other => Err(format!("unknown lifespan strategy: {}", other)),
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub source: SourceKind,
    pub risk_policy: RiskPolicy,
    pub lifespan_strategy: LifespanStrategy,
    /// Wait between acquisition cycles
    pub poll_interval_ms: u64,
    pub history_capacity: usize,
    pub channel_capacity: usize,

    pub serial_port: Option<String>,
    pub serial_baud: u32,
    pub serial_timeout_ms: u64,
    /// Serial connect failure is fatal instead of falling back to simulation
    pub serial_strict: bool,
    /// Replay a captured serial log instead of opening a device
    pub replay_file: Option<PathBuf>,

    pub model_dir: PathBuf,
    pub classifier_file: String,
    pub scaler_file: String,
    /// Empty disables the regressor
    pub regressor_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            risk_policy: RiskPolicy::default(),
            lifespan_strategy: LifespanStrategy::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            serial_port: None,
            serial_baud: DEFAULT_SERIAL_BAUD,
            serial_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
            serial_strict: false,
            replay_file: None,
            model_dir: get_default_model_dir(),
            classifier_file: DEFAULT_CLASSIFIER_FILE.to_string(),
            scaler_file: DEFAULT_SCALER_FILE.to_string(),
            regressor_file: DEFAULT_REGRESSOR_FILE.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration: `MONITOR_CONFIG` file if set, environment otherwise
    pub fn load() -> Result<Self, ConfigError> {
        match get_env_string("MONITOR_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Self::from_env(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            source: parse_env("MONITOR_SOURCE", defaults.source)?,
            risk_policy: parse_env("MONITOR_RISK_POLICY", defaults.risk_policy)?,
            lifespan_strategy: parse_env("MONITOR_LIFESPAN_STRATEGY", defaults.lifespan_strategy)?,
            poll_interval_ms: get_env_parsed("MONITOR_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            history_capacity: get_env_parsed("MONITOR_HISTORY_CAPACITY", defaults.history_capacity),
            channel_capacity: get_env_parsed("MONITOR_CHANNEL_CAPACITY", defaults.channel_capacity),
            serial_port: get_env_string("SERIAL_PORT"),
            serial_baud: get_env_parsed("SERIAL_BAUD", defaults.serial_baud),
            serial_timeout_ms: get_env_parsed("SERIAL_TIMEOUT_MS", defaults.serial_timeout_ms),
            serial_strict: get_env_flag("SERIAL_STRICT", defaults.serial_strict),
            replay_file: get_env_string("SERIAL_REPLAY_FILE").map(PathBuf::from),
            model_dir: get_env_string("MODEL_DIR").map(PathBuf::from).unwrap_or(defaults.model_dir),
            classifier_file: get_env_string("MODEL_CLASSIFIER_FILE").unwrap_or(defaults.classifier_file),
            scaler_file: get_env_string("MODEL_SCALER_FILE").unwrap_or(defaults.scaler_file),
            regressor_file: std::env::var("MODEL_REGRESSOR_FILE").unwrap_or(defaults.regressor_file),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        log::info!("Config loaded from: {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms must be within {}..={}, got {}",
                MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be > 0".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be > 0".to_string()));
        }
        if self.serial_timeout_ms == 0 {
            return Err(ConfigError::Invalid("serial_timeout_ms must be > 0".to_string()));
        }
        if self.source == SourceKind::Serial
            && self.serial_port.is_none()
            && self.replay_file.is_none()
        {
            return Err(ConfigError::Invalid(
                "serial source needs serial_port or replay_file".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn serial_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_timeout_ms)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        let regressor = self.regressor_file.trim();
        ArtifactPaths {
            classifier: self.model_dir.join(&self.classifier_file),
            scaler: self.model_dir.join(&self.scaler_file),
            regressor: (!regressor.is_empty()).then(|| self.model_dir.join(regressor)),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = String>,
{
    match get_env_string(key) {
        Some(value) => value.parse().map_err(ConfigError::Invalid),
        None => Ok(default),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.risk_policy, RiskPolicy::Model);
        assert_eq!(config.lifespan_strategy, LifespanStrategy::Rule);
        assert!(!config.serial_strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.json");
        std::fs::write(
            &path,
            r#"{"source":"manual","risk_policy":"rule","poll_interval_ms":200,"regressor_file":""}"#,
        ).unwrap();

        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.source, SourceKind::Manual);
        assert_eq!(config.risk_policy, RiskPolicy::Rule);
        assert_eq!(config.poll_interval_ms, 200);
        assert_eq!(config.history_capacity, 10);
        assert!(config.artifact_paths().regressor.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = MonitorConfig { poll_interval_ms: 5, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = MonitorConfig { source: SourceKind::Serial, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = MonitorConfig::from_file(Path::new("/nonexistent/monitor.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(MonitorConfig::from_file(&path), Err(ConfigError::Parse(_))));
    }
}
