//! Redirect handler.

use axum::{
    extract::{RawQuery, State},
    response::Response,
};

use super::super::types::{AppState, GoParams};
use crate::gateway::RedirectRequest;

/// `GET /go` and `GET /api/go`: forward, divert or reject.
pub async fn go_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let params = GoParams::from_query(query.as_deref().unwrap_or_default());
    let request = RedirectRequest::from_params(params.to.as_deref(), params.t.as_deref());
    state.gateway.handle(request.as_ref()).await
}
