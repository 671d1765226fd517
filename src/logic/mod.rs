//! Logic Module - Acquisition, Prediction & Models
//!
//! ## Layout
//! - `reading` / `sources/` - sensor readings and where they come from
//! - `lifespan` / `risk` - rule-based estimators
//! - `model/` - scaler, classifier, regressor artifacts (ONNX + JSON)
//! - `monitor/` - background acquisition loop and bounded history
//! - `config` / `error` - service configuration and error types

pub mod config;
pub mod error;
pub mod lifespan;
pub mod reading;
pub mod risk;

pub mod model;
pub mod monitor;
pub mod sources;
