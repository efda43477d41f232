use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppError;
use crate::users::User;
use crate::AppState;

// ─── POST /api/user ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    #[serde(default)]
    pub marital_status: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, AppError> {
    if req.first_name.is_empty() || req.last_name.is_empty() {
        return Err(AppError::BadRequest(
            "first_name and last_name must not be empty".into(),
        ));
    }

    let user_id = state
        .users
        .create_user(&req.first_name, &req.last_name, req.age, req.marital_status)
        .await?;

    tracing::info!(%user_id, "user created");

    Ok(Json(CreateUserResponse {
        success: true,
        message: "User created successfully".into(),
        user_id,
    }))
}

// ─── GET /api/users ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<User>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let users = state.users.get_users().await?;

    Ok(Json(ListUsersResponse {
        success: true,
        count: users.len(),
        users,
    }))
}
