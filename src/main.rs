use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod config;
mod gateway;
mod handlers;
mod metrics;
mod middleware;
mod monitor;
mod server;
mod stress;
mod users;

use gateway::postgres::PgGateway;
use gateway::redis::RedisGateway;
use metrics::Registry;
use users::UsersManager;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics registry — everything records here, the scrape
    /// endpoint reads from it.
    pub metrics: Arc<Registry>,

    /// Redis gateway (auto-reconnecting multiplexed connection).
    pub redis: Arc<RedisGateway>,

    /// User CRUD over both stores.
    pub users: UsersManager,

    /// Connection string handed to the connection-storm stress runner,
    /// which bypasses the shared pool on purpose.
    pub pg_url: String,

    /// Guard: at most one stress run at a time.
    pub stress_running: AtomicBool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::Config::from_env();
    tracing::info!(
        listen = %cfg.listen_addr,
        redis = %cfg.redis_url(),
        pg_host = %cfg.pg_host,
        pg_db = %cfg.pg_database,
        "starting up"
    );

    // ── 1. Metrics registry ──────────────────────────────────────
    let registry = Arc::new(Registry::new());

    // ── 2. Connect to Redis ──────────────────────────────────────
    let redis = match RedisGateway::connect(&cfg.redis_url(), &registry).await {
        Ok(gw) => Arc::new(gw),
        Err(err) => {
            tracing::error!(%err, "cannot connect to redis");
            std::process::exit(1);
        }
    };
    tracing::info!("redis connected");

    // ── 3. Connect to Postgres ───────────────────────────────────
    let pg = match PgGateway::connect(&cfg.pg_url(), &registry).await {
        Ok(gw) => Arc::new(gw),
        Err(err) => {
            tracing::error!(%err, "cannot connect to postgres");
            std::process::exit(1);
        }
    };
    tracing::info!("postgres connected");

    if let Err(err) = pg.create_table().await {
        tracing::warn!(%err, "could not create users table");
    }

    // ── 4. Background monitors ───────────────────────────────────
    tokio::spawn(monitor::monitor_memory(registry.clone()));
    tokio::spawn(monitor::keep_pool_alive(pg.pool().clone(), registry.clone()));

    // ── 5. Build shared state ────────────────────────────────────
    let users = match UsersManager::new(redis.clone(), pg.clone(), &registry) {
        Ok(mgr) => mgr,
        Err(err) => {
            tracing::error!(%err, "metric registration conflict");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        metrics: registry,
        redis,
        users,
        pg_url: cfg.pg_url(),
        stress_running: AtomicBool::new(false),
    });

    // ── 6. Bind & serve ──────────────────────────────────────────
    let app = server::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&cfg.listen_addr).await {
        Ok(l) => l,
        Err(err) => {
            tracing::error!(addr = %cfg.listen_addr, %err, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %cfg.listen_addr, "server listening");
    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(%err, "server exited with error");
        std::process::exit(1);
    }
}
