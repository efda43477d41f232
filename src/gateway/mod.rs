pub mod postgres;
pub mod redis;

use thiserror::Error;

use crate::metrics::MetricsError;

/// Failures crossing a storage gateway. Handlers map these onto HTTP
/// statuses; the gateways themselves only propagate.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("metrics: {0}")]
    Metrics(#[from] MetricsError),
}
