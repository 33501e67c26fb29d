//! # voxgate-observability
//!
//! Observability fuer voxgate:
//! - Prometheus-kompatible Metriken der Voice-Koordination
//! - Structured Logging (text/json) via tracing-subscriber

pub mod logging;
pub mod metrics;

pub use logging::{logging_initialisieren, LogFormat};
pub use metrics::VoiceMetrics;
