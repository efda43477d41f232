pub mod kv;
pub mod stress;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::users::UserError;

// ─── Shared response envelope ────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Gateway(String),
    Internal(String),
    StressRunning,
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Gateway(e) => Self::Gateway(e.to_string()),
            UserError::Serialize(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Gateway(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::StressRunning => {
                (StatusCode::CONFLICT, "A stress run is already in progress".into())
            }
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
