//! HTTP client initialization.
//!
//! The gateway uses three clients with different redirect behaviour:
//! - the probe client follows redirects (bounded, and guarded against
//!   non-public hops unless private targets are allowed)
//! - the chain client never follows redirects, so the inspector can walk and
//!   check every hop itself
//! - the service client talks to the key-value store and the messenger
//!
//! Per-call time budgets are applied by the callers; the clients only carry
//! the shared connect timeout.

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};

use crate::config::{Config, MAX_REDIRECT_HOPS, TCP_CONNECT_TIMEOUT};
use crate::security::check_probe_target;

/// Initializes the client used for HEAD/GET landing page probes.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_probe_client(config: &Config) -> Result<Client, reqwest::Error> {
    let allow_private_targets = config.allow_private_targets;
    let policy = Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECT_HOPS {
            attempt.error("too many redirects")
        } else if !allow_private_targets && check_probe_target(attempt.url()).is_err() {
            // Report the redirect itself instead of contacting the hop.
            attempt.stop()
        } else {
            attempt.follow()
        }
    });

    ClientBuilder::new()
        .redirect(policy)
        .connect_timeout(TCP_CONNECT_TIMEOUT)
        .user_agent(config.user_agent.clone())
        .build()
}

/// Initializes the client for redirect-chain inspection, with redirects
/// disabled.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_chain_client(config: &Config) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(Policy::none())
        .connect_timeout(TCP_CONNECT_TIMEOUT)
        .user_agent(config.user_agent.clone())
        .build()
}

/// Initializes the client for the key-value store and the messaging API.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_service_client() -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(Policy::none())
        .connect_timeout(TCP_CONNECT_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}
