//! Standardized database connection pool configuration
//!
//! Provides consistent pool settings across the hub services.

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Database pool configuration
#[derive(Clone, Debug)]
pub struct DbPoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum lifetime of a connection (prevents stale connections)
    pub max_lifetime: Duration,
    /// Maximum idle time before a connection is closed
    pub idle_timeout: Duration,
    /// Connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbPoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DbPoolConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self {
            max_connections: std::env::var("DB_POOL_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            max_lifetime: Duration::from_secs(
                std::env::var("DB_POOL_MAX_LIFETIME_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1800), // 30 minutes
            ),
            idle_timeout: Duration::from_secs(
                std::env::var("DB_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(600), // 10 minutes
            ),
            acquire_timeout: Duration::from_secs(
                std::env::var("DB_POOL_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Configuration sized for one-shot batch tools like the hub exporter.
    pub fn batch() -> Self {
        Self {
            max_connections: 4,
            min_connections: 1,
            max_lifetime: Duration::from_secs(1800),
            idle_timeout: Duration::from_secs(120),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Create a PostgreSQL connection pool with standardized configuration
pub async fn create_pool(database_url: &str, config: DbPoolConfig) -> Result<PgPool> {
    info!(
        "Creating database pool: max={}, min={}, max_lifetime={:?}, idle_timeout={:?}",
        config.max_connections, config.min_connections, config.max_lifetime, config.idle_timeout
    );

    let connect_opts =
        PgConnectOptions::from_str(database_url).context("Failed to parse database URL")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_opts)
        .await
        .context("Failed to create database pool")?;

    info!("Database pool created successfully");
    Ok(pool)
}
