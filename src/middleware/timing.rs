use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::Registry;

/// Records per-request metrics for every `/api/` route:
///
///   api_requests_total{method,endpoint,status}  — counter
///   http_request_duration_seconds{endpoint}     — gauge, last request
///
/// The `endpoint` label is the matched route template (e.g.
/// `/api/get/:key`), never the raw request path — raw paths carry
/// caller-controlled values and would mint an unbounded number of
/// permanent series. Requests that match no route are skipped, and so
/// is the scrape endpoint, so scraping does not inflate the numbers
/// it reports.
pub async fn metrics_middleware(
    State(metrics): State<Arc<Registry>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned());

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = start.elapsed();

    let Some(endpoint) = endpoint else {
        return response;
    };

    if endpoint.starts_with("/api/") {
        let status = response.status().as_u16().to_string();
        metrics.increment_counter(
            "api_requests_total",
            &[
                ("method", method.as_str()),
                ("endpoint", &endpoint),
                ("status", &status),
            ],
        );
        metrics.set_gauge(
            "http_request_duration_seconds",
            elapsed.as_secs_f64(),
            &[("endpoint", &endpoint)],
        );

        tracing::debug!(
            method = %method,
            %endpoint,
            status = %response.status(),
            elapsed_us = elapsed.as_micros() as u64,
            "request completed"
        );
    }

    response
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware as axum_mw, routing::get, Router};
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "ok"
    }

    fn router(metrics: Arc<Registry>) -> Router {
        Router::new()
            .route("/api/get/:key", get(ok))
            .layer(axum_mw::from_fn_with_state(metrics, metrics_middleware))
    }

    #[tokio::test]
    async fn endpoint_label_is_the_route_template_not_the_raw_path() {
        let metrics = Arc::new(Registry::new());
        let app = router(metrics.clone());

        for key in ["alpha", "beta", "gamma"] {
            let req = HttpRequest::builder()
                .uri(format!("/api/get/{key}"))
                .body(Body::empty())
                .unwrap();
            let _ = app.clone().oneshot(req).await.unwrap();
        }

        let text = metrics.export();
        assert!(text.contains(
            r#"api_requests_total{endpoint="/api/get/:key",method="GET",status="200"} 3.000000"#
        ));
        // One series regardless of how many distinct keys were hit
        assert!(!text.contains("alpha"));
        assert!(!text.contains("beta"));
    }

    #[tokio::test]
    async fn unmatched_paths_record_nothing() {
        let metrics = Arc::new(Registry::new());
        let app = router(metrics.clone());

        let req = HttpRequest::builder()
            .uri("/api/get/x/../../etc/passwd")
            .body(Body::empty())
            .unwrap();
        let _ = app.oneshot(req).await.unwrap();

        assert_eq!(metrics.export(), "");
    }
}
