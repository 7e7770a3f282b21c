//! Messenger diagnostic handler.
//!
//! Sends a test message through the configured messenger and echoes the raw
//! answer, so operators can verify credentials without waiting for a dead
//! link.

use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::super::types::{
    AppState, DiagDelivery, DiagError, DiagParams, DiagRequestEcho, DiagResponse,
};
use crate::config::{APPLICATION_JSON_UTF8, DIAG_DEFAULT_TEXT};
use crate::notify::escape_html;

/// `GET /api/diag-telegram?text=...`
pub async fn diag_telegram_handler(
    State(state): State<AppState>,
    Query(params): Query<DiagParams>,
) -> Response {
    let Some(messenger) = state.gateway.notifier().messenger() else {
        return json_error("Missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID".to_string());
    };

    let text = params
        .text
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DIAG_DEFAULT_TEXT.to_string());

    match messenger.send(&escape_html(&text)).await {
        Ok(report) => {
            log::info!("Diagnostic message delivered with status {}", report.status);
            json_response(
                StatusCode::OK,
                &DiagResponse {
                    request: DiagRequestEcho {
                        chat_id: messenger.recipient().to_string(),
                        text,
                    },
                    response: DiagDelivery {
                        status: report.status,
                        body: report.body,
                    },
                },
            )
        }
        Err(e) => {
            log::warn!("Diagnostic message failed: {e}");
            json_error(e.to_string())
        }
    }
}

fn json_error(error: String) -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &DiagError { ok: false, error },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => (status, [(CONTENT_TYPE, APPLICATION_JSON_UTF8)], json).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize response: {e}"),
        )
            .into_response(),
    }
}
