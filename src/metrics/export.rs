use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::AppState;

// ─── GET /metrics ────────────────────────────────────────────────
/// Serves the registry's exposition text verbatim, one line per
/// series, for line-oriented scrapers. Intentionally minimal: no
/// TYPE/HELP comments, just `name{labels} value`.

pub async fn export_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.export(),
    )
}
