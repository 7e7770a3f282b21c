//! JSON status handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::super::types::{AlertCounts, AppState, RequestCounts, StatusResponse};
use crate::error_handling::OutcomeType;

/// JSON status endpoint with per-outcome counters
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let stats = &state.stats;
    let response = StatusResponse {
        env: state.env_label.clone(),
        uptime_seconds: stats.uptime_seconds(),
        total_requests: stats.total_requests(),
        requests: RequestCounts {
            forwarded: stats.get(OutcomeType::Forwarded),
            diverted_dead_link: stats.get(OutcomeType::DivertedDeadLink),
            diverted_problematic_redirect: stats.get(OutcomeType::DivertedProblematicRedirect),
            rejected: stats.get(OutcomeType::Rejected),
        },
        alerts: AlertCounts {
            sent: stats.get(OutcomeType::AlertSent),
            throttled: stats.get(OutcomeType::AlertThrottled),
            delivery_failed: stats.get(OutcomeType::AlertDeliveryFailed),
            store_unavailable: stats.get(OutcomeType::StoreUnavailable),
        },
        probe_indeterminate: stats.get(OutcomeType::ProbeIndeterminate),
    };

    let json = match serde_json::to_string_pretty(&response) {
        Ok(json) => json,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize status: {}", e),
            )
                .into_response();
        }
    };

    (StatusCode::OK, [("content-type", "application/json")], json).into_response()
}

/// `GET /health`
pub async fn health_handler() -> &'static str {
    "ok"
}
