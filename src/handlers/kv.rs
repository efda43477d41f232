use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiMessage, AppError};
use crate::AppState;

// ─── POST /api/set ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

pub async fn set_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    if req.key.is_empty() {
        return Err(AppError::BadRequest("key must not be empty".into()));
    }

    state.redis.set(&req.key, &req.value).await?;

    Ok(Json(ApiMessage {
        success: true,
        message: format!("Stored key '{}'", req.key),
    }))
}

// ─── GET /api/get/:key ───────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

pub async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>, AppError> {
    match state.redis.get(&key).await? {
        Some(value) => Ok(Json(GetResponse { key, value })),
        None => Err(AppError::NotFound(format!("key '{key}' not found"))),
    }
}
