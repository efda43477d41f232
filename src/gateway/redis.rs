use std::time::Instant;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::GatewayError;
use crate::metrics::{CounterHandle, GaugeHandle, Registry};

/// Redis gateway: a cheaply-cloneable multiplexed connection plus the
/// metric handles every call site records into.
///
/// Each operation counts `redis_<op>_total{status}` and sets
/// `redis_<op>_duration_seconds` whether it succeeds or fails, so the
/// scrape view keeps showing error traffic.
pub struct RedisGateway {
    conn: ConnectionManager,
    set_total: CounterHandle,
    get_total: CounterHandle,
    set_duration: GaugeHandle,
    get_duration: GaugeHandle,
}

impl RedisGateway {
    /// Opens the connection manager (auto-reconnects on failure) and
    /// resolves the gateway's metric families once up front.
    pub async fn connect(url: &str, metrics: &Registry) -> Result<Self, GatewayError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        metrics.set_gauge("redis_connection_status", 1.0, &[]);

        Ok(Self {
            conn,
            set_total: metrics.counter("redis_set_total")?,
            get_total: metrics.counter("redis_get_total")?,
            set_duration: metrics.gauge("redis_set_duration_seconds")?,
            get_duration: metrics.gauge("redis_get_duration_seconds")?,
        })
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let start = Instant::now();
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<()> = conn.set(key, value).await;

        self.set_total.increment(&[("status", status_of(&res))]);
        self.set_duration.set(start.elapsed().as_secs_f64(), &[]);

        res.map_err(Into::into)
    }

    /// `Ok(None)` on a cache miss; misses still count as successes.
    pub async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let start = Instant::now();
        let mut conn = self.conn.clone();
        let res: redis::RedisResult<Option<String>> = conn.get(key).await;

        self.get_total.increment(&[("status", status_of(&res))]);
        self.get_duration.set(start.elapsed().as_secs_f64(), &[]);

        res.map_err(Into::into)
    }
}

fn status_of<T>(res: &redis::RedisResult<T>) -> &'static str {
    if res.is_ok() {
        "success"
    } else {
        "error"
    }
}
