//! Prometheus metrics handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::super::types::AppState;
use crate::error_handling::GatewayStats;

/// Prometheus-compatible metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    (StatusCode::OK, render_metrics(&state.stats)).into_response()
}

/// Prometheus text exposition of the gateway counters.
pub fn render_metrics(stats: &GatewayStats) -> String {
    let mut metrics = format!(
        r#"# HELP affiliate_gateway_uptime_seconds Seconds since the gateway started
# TYPE affiliate_gateway_uptime_seconds gauge
affiliate_gateway_uptime_seconds {}

# HELP affiliate_gateway_requests_total Redirect requests answered
# TYPE affiliate_gateway_requests_total counter
affiliate_gateway_requests_total {}

# HELP affiliate_gateway_outcomes_total Pipeline outcomes by kind
# TYPE affiliate_gateway_outcomes_total counter
"#,
        stats.uptime_seconds(),
        stats.total_requests(),
    );

    for (outcome, count) in stats.snapshot() {
        metrics.push_str(&format!(
            "affiliate_gateway_outcomes_total{{outcome=\"{}\"}} {}\n",
            outcome, count
        ));
    }

    metrics
}
