use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::GatewayError;
use crate::metrics::{CounterHandle, GaugeHandle, Registry};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id    TEXT PRIMARY KEY,
    data       JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Postgres gateway backed by a shared connection pool.
pub struct PgGateway {
    pool: PgPool,
    save_total: CounterHandle,
    save_duration: GaugeHandle,
}

impl PgGateway {
    pub async fn connect(url: &str, metrics: &Registry) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(50)
            .min_connections(10)
            .max_lifetime(Duration::from_secs(300))
            .connect(url)
            .await?;

        metrics.set_gauge("postgres_connection_status", 1.0, &[]);

        Ok(Self {
            pool,
            save_total: metrics.counter("pg_save_user_total")?,
            save_duration: metrics.gauge("pg_save_user_duration_seconds")?,
        })
    }

    /// Shared pool handle, used by the keeper task for occupancy gauges.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_table(&self) -> Result<(), GatewayError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Upsert one user row keyed by id, with the entity stored as JSONB.
    pub async fn save_user(&self, user_id: &str, json: &str) -> Result<(), GatewayError> {
        let start = Instant::now();
        let res = sqlx::query(
            "INSERT INTO users (user_id, data) VALUES ($1, $2::jsonb) \
             ON CONFLICT (user_id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(user_id)
        .bind(json)
        .execute(&self.pool)
        .await;

        let status = if res.is_ok() { "success" } else { "error" };
        self.save_total.increment(&[("status", status)]);
        self.save_duration.set(start.elapsed().as_secs_f64(), &[]);

        res.map(|_| ()).map_err(Into::into)
    }

    /// All stored users as `(user_id, json)` pairs, oldest first.
    pub async fn fetch_users(&self) -> Result<Vec<(String, String)>, GatewayError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT user_id, data::text FROM users ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}
