//! Error handling and gateway statistics.
//!
//! This module provides:
//! - Error type definitions for every component
//! - The visitor-facing `RejectReason`
//! - Probe failure categorization
//! - Outcome counters for the observability endpoints
//!
//! Errors are categorized into:
//! - **Client input errors**: rejected with 400 (`RejectReason`)
//! - **Probe transport errors**: resolved to the fail-open default (`ProbeFailure`)
//! - **Collaborator errors**: the notifier silently no-ops (`StoreError`, `MessengerError`)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::categorize_reqwest_error;
pub use stats::GatewayStats;
pub use types::{
    InitializationError, MessengerError, OutcomeType, ProbeFailure, RejectReason, StoreError,
    StoreResult,
};
