//! Core shared utilities for neuroscan services: tracing, layered configuration and metrics exposition.

pub mod metrics;
pub mod settings;
pub mod telemetry;

pub use metrics::metrics_handler;
pub use settings::{load_config, ModelSettings, ServerSettings, Settings};
pub use telemetry::init_tracing;
