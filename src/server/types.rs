//! Server data structures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::config::{BASE64_PARAM, PLAIN_PARAM};
use crate::error_handling::GatewayStats;
use crate::gateway::Gateway;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub stats: Arc<GatewayStats>,
    pub env_label: String,
}

/// Destination parameters of a redirect request.
///
/// Parsed from the raw query string so that repeated or malformed parameters
/// never turn into an extractor rejection; the first occurrence of each key
/// wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GoParams {
    pub to: Option<String>,
    pub t: Option<String>,
}

impl GoParams {
    pub fn from_query(query: &str) -> Self {
        let mut params = GoParams::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = if key == PLAIN_PARAM {
                &mut params.to
            } else if key == BASE64_PARAM {
                &mut params.t
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Query of the diagnostic messenger endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DiagParams {
    pub text: Option<String>,
}

/// JSON response for `/api/diag-telegram`
#[derive(Serialize)]
pub struct DiagResponse {
    pub request: DiagRequestEcho,
    pub response: DiagDelivery,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagRequestEcho {
    pub chat_id: String,
    pub text: String,
}

#[derive(Serialize)]
pub struct DiagDelivery {
    pub status: u16,
    pub body: String,
}

/// JSON error body of the diagnostic endpoint
#[derive(Serialize)]
pub struct DiagError {
    pub ok: bool,
    pub error: String,
}

/// JSON response for `/status` endpoint
#[derive(Serialize)]
pub struct StatusResponse {
    pub env: String,
    pub uptime_seconds: f64,
    pub total_requests: usize,
    pub requests: RequestCounts,
    pub alerts: AlertCounts,
    pub probe_indeterminate: usize,
}

#[derive(Serialize)]
pub struct RequestCounts {
    pub forwarded: usize,
    pub diverted_dead_link: usize,
    pub diverted_problematic_redirect: usize,
    pub rejected: usize,
}

#[derive(Serialize)]
pub struct AlertCounts {
    pub sent: usize,
    pub throttled: usize,
    pub delivery_failed: usize,
    pub store_unavailable: usize,
}
