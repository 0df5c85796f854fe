//! Route handlers and error rendering.
//!
//! Handlers only decode the body and hand it to the orchestrator; every
//! failure comes back as `{"detail": "..."}` with the status chosen by
//! [`DuetError::status_code`].

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use duet_core::{AskRequest, DuetError, IdeRequest, MergedResponse};

use crate::BridgeState;

/// Orchestrator error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub DuetError);

impl From<DuetError> for ApiError {
    fn from(err: DuetError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
        let detail = self.0.to_string();
        warn!(target: "bridge", status = status.as_u16(), detail = %detail, "Request failed");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// POST /ask
pub async fn ask(
    State(state): State<BridgeState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<MergedResponse>, ApiError> {
    let merged = state.orchestrator.handle_ask(request).await?;
    Ok(Json(merged))
}

/// POST /ide
pub async fn ide(
    State(state): State<BridgeState>,
    Json(request): Json<IdeRequest>,
) -> Result<Json<MergedResponse>, ApiError> {
    let merged = state.orchestrator.handle_ide(request).await?;
    Ok(Json(merged))
}

/// GET /health
pub async fn health(State(state): State<BridgeState>) -> Json<Value> {
    let config = state.orchestrator.config();
    Json(json!({
        "ok": true,
        "model_transport": config.model.transport.mode(),
        "sourced_answer_configured": config.sourced_answer.is_configured(),
    }))
}
