//! Probe failure categorization.
//!
//! Maps reqwest transport errors onto the coarse `ProbeFailure` categories used
//! in logs and statistics.

use super::types::ProbeFailure;

/// Categorizes a `reqwest::Error` into a `ProbeFailure`.
///
/// Status errors cannot occur here: probes never call `error_for_status()`,
/// a 4xx/5xx response is a successful probe with a status.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ProbeFailure {
    if error.is_timeout() {
        ProbeFailure::Timeout
    } else if error.is_connect() {
        ProbeFailure::Connect
    } else if error.is_redirect() {
        ProbeFailure::Redirect
    } else if error.is_builder() || error.is_request() {
        ProbeFailure::Request
    } else {
        ProbeFailure::Other
    }
}
