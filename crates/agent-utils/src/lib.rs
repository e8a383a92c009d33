//! Shared utilities for the financial agent workspace
//!
//! Logging setup and environment-backed settings used by the binaries and
//! the orchestrator.

pub mod config;
pub mod logging;

pub use config::{Settings, SettingsError};
pub use logging::init_tracing;
