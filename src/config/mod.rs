//! Monitor Configuration Module
//!
//! Capture, magnification and heart-rate settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `PULSECAM_CONFIG` environment variable (path to TOML file)
//! 2. `pulsecam.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded [`MonitorConfig`] is handed to the pipeline and monitor loop
//! by value; there is no process-wide config instance.

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
