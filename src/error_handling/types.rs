//! Error type definitions.
//!
//! This module defines the error and outcome types used throughout the gateway.
//! Only `RejectReason` ever reaches a visitor; every other error is owned by the
//! component that produced it and converted to that component's safe default.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error building a collaborator from configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Why a redirect request was refused with 400.
///
/// The display strings are the visitor-facing response bodies.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No candidate URL, undecodable input, or not an absolute URL.
    #[error("Bad request: invalid URL")]
    InvalidUrl,

    /// The destination scheme is not http or https.
    #[error("Bad request: protocol must be http/https")]
    UnsupportedScheme,

    /// The destination host is not an approved affiliate tracker.
    #[error("Bad request: domain not allowed")]
    DomainNotAllowed,
}

/// Errors from key-value store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached (network failure, timeout, 5xx).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error for the command.
    #[error("Store rejected command: {0}")]
    Rejected(String),

    /// The store answered with something the client cannot interpret.
    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),
}

/// Result type for key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the alert messaging endpoint.
#[derive(Error, Debug)]
pub enum MessengerError {
    /// Credentials or recipient are missing.
    #[error("Messenger not configured: {0}")]
    NotConfigured(&'static str),

    /// The request never produced a response.
    #[error("Messenger transport error: {0}")]
    Transport(#[from] ReqwestError),

    /// The request exceeded its time budget.
    #[error("Messenger request timed out after {0} ms")]
    Timeout(u64),
}

/// Category of a failed outbound probe.
///
/// Failures never change a verdict to dead; the category only feeds logs and
/// statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeFailure {
    /// The per-call time budget elapsed.
    Timeout,
    /// TCP/TLS connection could not be established (includes DNS failures).
    Connect,
    /// Too many redirects or a redirect loop.
    Redirect,
    /// The request could not be built or sent.
    Request,
    /// Anything else reqwest reports.
    Other,
}

impl ProbeFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeFailure::Timeout => "timeout",
            ProbeFailure::Connect => "connect",
            ProbeFailure::Redirect => "redirect",
            ProbeFailure::Request => "request",
            ProbeFailure::Other => "other",
        }
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request outcomes counted by `GatewayStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum OutcomeType {
    // Visitor-facing decisions
    Forwarded,
    DivertedDeadLink,
    DivertedProblematicRedirect,
    Rejected,
    // Probe results
    ProbeIndeterminate,
    // Notifier results
    AlertSent,
    AlertThrottled,
    AlertDeliveryFailed,
    StoreUnavailable,
}

impl std::fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutcomeType {
    /// Metric-friendly snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeType::Forwarded => "forwarded",
            OutcomeType::DivertedDeadLink => "diverted_dead_link",
            OutcomeType::DivertedProblematicRedirect => "diverted_problematic_redirect",
            OutcomeType::Rejected => "rejected",
            OutcomeType::ProbeIndeterminate => "probe_indeterminate",
            OutcomeType::AlertSent => "alert_sent",
            OutcomeType::AlertThrottled => "alert_throttled",
            OutcomeType::AlertDeliveryFailed => "alert_delivery_failed",
            OutcomeType::StoreUnavailable => "store_unavailable",
        }
    }
}
