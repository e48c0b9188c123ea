//! # Framework Integrations
//!
//! Thin bindings wiring the generic middleware into concrete frameworks.
//! Each binding resolves the framework's route template (the adapter
//! contract, see [`crate::middleware::route`]) and mounts the exposition
//! endpoint in the framework's own routing vocabulary.

pub mod axum;

pub use self::axum::{setup_metrics, setup_tracing, METRICS_ENDPOINT};
