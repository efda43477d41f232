use axum::{extract::State, Json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::AppError;
use crate::stress::{self, PgStressReport, RedisStressReport};
use crate::AppState;

// ─── Run guard ───────────────────────────────────────────────────

/// Clears the in-progress flag when dropped. The handler future can
/// die at any await — client disconnect, panic — and the flag must
/// still come back down or every later stress request gets a 409.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ─── POST /api/stress/redis ──────────────────────────────────────

pub async fn stress_redis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RedisStressReport>, AppError> {
    // Guard: only one stress run at a time, of either flavour
    if state.stress_running.swap(true, Ordering::SeqCst) {
        return Err(AppError::StressRunning);
    }
    let _guard = RunningGuard(&state.stress_running);

    let report = stress::redis_key_storm(&state.redis, &state.metrics).await;
    Ok(Json(report))
}

// ─── POST /api/stress/postgres ───────────────────────────────────

pub async fn stress_postgres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PgStressReport>, AppError> {
    if state.stress_running.swap(true, Ordering::SeqCst) {
        return Err(AppError::StressRunning);
    }
    let _guard = RunningGuard(&state.stress_running);

    let report = stress::pg_connection_storm(&state.pg_url).await;
    Ok(Json(report))
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_flag_on_drop() {
        let flag = AtomicBool::new(false);

        assert!(!flag.swap(true, Ordering::SeqCst));
        {
            let _guard = RunningGuard(&flag);
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn run_aborted_mid_await_releases_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn({
            let flag = flag.clone();
            async move {
                assert!(!flag.swap(true, Ordering::SeqCst));
                let _guard = RunningGuard(&flag);
                // Parks forever, like a storm still in flight when the
                // client disconnects.
                std::future::pending::<()>().await;
            }
        });

        // Wait until the task has raised the flag and parked
        while !flag.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        // Dropping the future at its await point must run the guard
        task.abort();
        let _ = task.await;
        assert!(!flag.load(Ordering::SeqCst));
    }
}
