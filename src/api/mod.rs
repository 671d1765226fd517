//! API Module - Console presentation layer
//!
//! - `commands`: operator commands and result rendering
//! - `engine_status`: model and monitor status view

pub mod commands;
pub mod engine_status;
