use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::export;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── User endpoints ──────────────────────────────────────
        .route("/api/user", post(handlers::users::create_user))
        .route("/api/users", get(handlers::users::list_users))
        // ── Key/value endpoint ──────────────────────────────────
        .route("/api/set", post(handlers::kv::set_key))
        .route("/api/get/:key", get(handlers::kv::get_key))
        // ── Stress runners ──────────────────────────────────────
        .route("/api/stress/redis", post(handlers::stress::stress_redis))
        .route(
            "/api/stress/postgres",
            post(handlers::stress::stress_postgres),
        )
        // ── Scrape endpoint ─────────────────────────────────────
        .route("/metrics", get(export::export_metrics))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.metrics.clone(),
            timing::metrics_middleware,
        ))
        .layer(CorsLayer::permissive())
}
