//! Artifact Files - locating, reading and verifying model files
//!
//! Each artifact may have a sidecar `<file>.sha256` holding the hex digest of
//! the file. When the sidecar exists the digest must match before the bytes
//! are handed to a decoder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ArtifactKind;
use crate::constants::{DEFAULT_CLASSIFIER_FILE, DEFAULT_REGRESSOR_FILE, DEFAULT_SCALER_FILE};
use crate::logic::error::{LoadFailure, ModelLoadError};

/// Sidecar extension for digests
const CHECKSUM_EXT: &str = "sha256";

/// Filesystem locations of the three artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    /// Optional; absent means rule-based lifespan only
    pub regressor: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Default file names inside a model directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            classifier: dir.join(DEFAULT_CLASSIFIER_FILE),
            scaler: dir.join(DEFAULT_SCALER_FILE),
            regressor: Some(dir.join(DEFAULT_REGRESSOR_FILE)),
        }
    }
}

/// Per-file load outcome, kept for status display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArtifactStatus {
    Loaded,
    NotConfigured,
    Missing,
    Invalid(String),
    ChecksumMismatch,
}

impl ArtifactStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ArtifactStatus::Loaded)
    }
}

impl From<&LoadFailure> for ArtifactStatus {
    fn from(failure: &LoadFailure) -> Self {
        match failure {
            LoadFailure::Missing => ArtifactStatus::Missing,
            LoadFailure::Invalid(reason) => ArtifactStatus::Invalid(reason.clone()),
            LoadFailure::ChecksumMismatch { .. } => ArtifactStatus::ChecksumMismatch,
        }
    }
}

/// Hex SHA-256 of some bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_EXT);
    PathBuf::from(name)
}

/// Read an artifact's bytes, verifying the sidecar digest if present
pub fn read_artifact(kind: ArtifactKind, path: &Path) -> Result<Vec<u8>, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::missing(kind, path));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| ModelLoadError::invalid(kind, path, e))?;

    let sidecar = checksum_path(path);
    if sidecar.exists() {
        let content = std::fs::read_to_string(&sidecar)
            .map_err(|e| ModelLoadError::invalid(kind, &sidecar, e))?;
        // `sha256sum` output: "<digest>  <file name>"
        let expected = content
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let actual = sha256_hex(&bytes);

        if expected != actual {
            return Err(ModelLoadError {
                artifact: kind,
                path: path.to_path_buf(),
                failure: LoadFailure::ChecksumMismatch { expected, actual },
            });
        }
        log::debug!("[Models] {} checksum verified", kind);
    }

    Ok(bytes)
}
