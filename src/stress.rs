use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use sqlx::{Connection, PgConnection};

use crate::gateway::redis::RedisGateway;
use crate::metrics::Registry;

// ─── Redis key storm ─────────────────────────────────────────────

const TOTAL_KEYS: usize = 5_000;
const VALUE_SIZE: usize = 4_096; // bytes

#[derive(Debug, Serialize)]
pub struct RedisStressReport {
    pub successful_keys: usize,
    pub failed_keys: usize,
    pub duration_seconds: f64,
    pub keys_per_second: f64,
    pub total_bytes: u64,
}

/// Writes `TOTAL_KEYS` values of ~4KB through the gateway, so every
/// write lands in `redis_set_total` / `redis_set_duration_seconds`
/// like regular traffic. Payload volume accumulates into
/// `stress_bytes_written_total`.
pub async fn redis_key_storm(redis: &RedisGateway, metrics: &Registry) -> RedisStressReport {
    tracing::info!(total_keys = TOTAL_KEYS, "starting redis key storm");

    // ThreadRng is !Send, so keep it out of scope before the awaits
    let base_value: String = {
        let mut rng = rand::thread_rng();
        (0..VALUE_SIZE)
            .map(|_| rng.gen_range(b'A'..=b'Z') as char)
            .collect()
    };

    let mut successful_keys = 0usize;
    let mut failed_keys = 0usize;
    let mut total_bytes = 0u64;

    let bytes_written = match metrics.counter("stress_bytes_written_total") {
        Ok(counter) => Some(counter),
        Err(err) => {
            tracing::error!(%err, "stress byte counter unavailable");
            None
        }
    };

    let start = Instant::now();
    for i in 0..TOTAL_KEYS {
        let key = format!("stress:key:{i}");
        let value = format!("{base_value}-{i}");

        match redis.set(&key, &value).await {
            Ok(()) => {
                successful_keys += 1;
                total_bytes += value.len() as u64;
                if let Some(counter) = &bytes_written {
                    counter.increment_by(&[], value.len() as f64);
                }
            }
            Err(err) => {
                failed_keys += 1;
                tracing::error!(%key, %err, "stress write failed");
            }
        }
    }

    let duration_seconds = start.elapsed().as_secs_f64();
    let keys_per_second = if duration_seconds > 0.0 {
        successful_keys as f64 / duration_seconds
    } else {
        0.0
    };

    tracing::info!(
        successful_keys,
        failed_keys,
        duration_seconds,
        "redis key storm finished"
    );

    RedisStressReport {
        successful_keys,
        failed_keys,
        duration_seconds,
        keys_per_second,
        total_bytes,
    }
}

// ─── Postgres connection storm ───────────────────────────────────

const CONN_COUNT: usize = 50;

#[derive(Debug, Serialize)]
pub struct PgStressReport {
    pub successful_connections: usize,
    pub failed_connections: usize,
    pub duration_seconds: f64,
    pub average_latency_seconds: f64,
}

/// Opens `CONN_COUNT` one-shot connections in parallel, each running a
/// trivial query, deliberately bypassing the shared pool to exercise
/// the server's connection path.
pub async fn pg_connection_storm(url: &str) -> PgStressReport {
    tracing::info!(connections = CONN_COUNT, "starting postgres connection storm");

    let start = Instant::now();
    let mut handles = Vec::with_capacity(CONN_COUNT);

    for idx in 0..CONN_COUNT {
        let url = url.to_owned();
        handles.push(tokio::spawn(async move {
            let t0 = Instant::now();
            let mut conn = match PgConnection::connect(&url).await {
                Ok(conn) => conn,
                Err(err) => {
                    tracing::error!(idx, %err, "storm connection failed");
                    return None;
                }
            };

            if let Err(err) = sqlx::query("SELECT 1").execute(&mut conn).await {
                tracing::error!(idx, %err, "storm query failed");
                return None;
            }
            let _ = conn.close().await;

            Some(t0.elapsed().as_secs_f64())
        }));
    }

    let mut latencies = Vec::with_capacity(CONN_COUNT);
    let mut failed_connections = 0usize;
    for h in handles {
        match h.await {
            Ok(Some(latency)) => latencies.push(latency),
            _ => failed_connections += 1,
        }
    }

    let duration_seconds = start.elapsed().as_secs_f64();
    let average_latency_seconds = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    tracing::info!(
        successful_connections = latencies.len(),
        failed_connections,
        duration_seconds,
        "postgres connection storm finished"
    );

    PgStressReport {
        successful_connections: latencies.len(),
        failed_connections,
        duration_seconds,
        average_latency_seconds,
    }
}
