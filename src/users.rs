use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::postgres::PgGateway;
use crate::gateway::redis::RedisGateway;
use crate::gateway::GatewayError;
use crate::metrics::{CounterHandle, MetricsError, Registry};

/// Series name the existing dashboards alert on; renaming it would
/// silently blank their panels.
pub const USER_CREATED_TOTAL: &str = "user_created_total";

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub marital_status: bool,
    pub created_at: String,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ─── UsersManager ────────────────────────────────────────────────

/// User CRUD over both stores: Postgres is the source of truth,
/// Redis is a best-effort cache.
pub struct UsersManager {
    redis: Arc<RedisGateway>,
    pg: Arc<PgGateway>,
    users_created: CounterHandle,
}

impl UsersManager {
    pub fn new(
        redis: Arc<RedisGateway>,
        pg: Arc<PgGateway>,
        metrics: &Registry,
    ) -> Result<Self, MetricsError> {
        Ok(Self {
            redis,
            pg,
            users_created: metrics.counter(USER_CREATED_TOTAL)?,
        })
    }

    /// Persists a new user and returns its generated id.
    ///
    /// A Postgres failure aborts the creation; a Redis cache failure
    /// is only logged.
    pub async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        age: u32,
        marital_status: bool,
    ) -> Result<String, UserError> {
        let user = User {
            user_id: format!("usr_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            age,
            marital_status,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string(&user)?;

        self.pg.save_user(&user.user_id, &json).await?;

        if let Err(err) = self.redis.set(&format!("user:{}", user.user_id), &json).await {
            tracing::warn!(user_id = %user.user_id, %err, "failed to cache user in redis");
        }

        self.users_created.increment(&[]);
        Ok(user.user_id)
    }

    /// All users from Postgres. Rows that no longer deserialize are
    /// logged and skipped rather than failing the whole listing.
    pub async fn get_users(&self) -> Result<Vec<User>, UserError> {
        let rows = self.pg.fetch_users().await?;

        let mut users = Vec::with_capacity(rows.len());
        for (user_id, json) in rows {
            match serde_json::from_str::<User>(&json) {
                Ok(user) => users.push(user),
                Err(err) => tracing::error!(%user_id, %err, "skipping corrupt user row"),
            }
        }
        Ok(users)
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_creation_series_keeps_its_scrape_name() {
        let reg = Registry::new();
        let counter = reg.counter(USER_CREATED_TOTAL).unwrap();
        counter.increment(&[]);
        assert_eq!(reg.export(), "user_created_total 1.000000\n");
    }
}
