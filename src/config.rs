use std::env;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub redis_host: String,
    pub redis_port: String,
    pub pg_host: String,
    pub pg_port: String,
    pub pg_user: String,
    pub pg_password: String,
    pub pg_database: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
            redis_host: env_or("REDIS_HOST", "localhost"),
            redis_port: env_or("REDIS_PORT", "6379"),
            pg_host: env_or("POSTGRES_HOST", "localhost"),
            pg_port: env_or("POSTGRES_PORT", "5432"),
            pg_user: env_or("POSTGRES_USER", "appuser"),
            pg_password: env_or("POSTGRES_PASSWORD", "apppass"),
            pg_database: env_or("POSTGRES_DB", "appdb"),
        }
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    pub fn pg_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.pg_user, self.pg_password, self.pg_host, self.pg_port, self.pg_database
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_assembled_from_parts() {
        let cfg = Config {
            listen_addr: "0.0.0.0:8080".into(),
            redis_host: "cache".into(),
            redis_port: "6380".into(),
            pg_host: "db".into(),
            pg_port: "5433".into(),
            pg_user: "u".into(),
            pg_password: "p".into(),
            pg_database: "d".into(),
        };
        assert_eq!(cfg.redis_url(), "redis://cache:6380/");
        assert_eq!(cfg.pg_url(), "postgres://u:p@db:5433/d");
    }
}
