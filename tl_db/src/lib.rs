//! ABOUTME: Database layer with a bounded connection pool and repositories
//! ABOUTME: Works against PostgreSQL in production and SQLite in tests

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool};
use std::sync::Arc;
use std::time::Duration;
use tl_core::{Error, Result};
use tl_obs::Dependency;
use tracing::{debug, info, instrument, warn};

pub mod bootstrap;
pub mod metrics;
pub mod repositories;

pub use bootstrap::{Bootstrap, Ready, ResourceInitializer};
pub use metrics::PoolMetrics;
pub use repositories::{
    inventory::{Availability, InventoryBootstrap, InventoryItem, InventoryRepository},
    orders::{CreateOrderRequest, Order, OrderBootstrap, OrderRepository},
    users::{CreateUserRequest, UpdateUserRequest, User, UserBootstrap, UserRepository},
};

/// A pooled connection; returned to the pool when dropped
pub type Connection = PoolConnection<Any>;

/// Pool bounds and timeouts
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 15,
            min_connections: 2,
            idle_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(60),
        }
    }
}

/// Database connection pool and operations
#[derive(Debug, Clone)]
pub struct Db {
    pool: AnyPool,
    metrics: Arc<PoolMetrics>,
}

impl Db {
    /// Build the pool without opening any connection.
    /// Reachability is established later by the [`ResourceInitializer`].
    pub fn connect_lazy(settings: &PoolSettings) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections.min(settings.max_connections))
            .idle_timeout(Some(settings.idle_timeout))
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy(&settings.url)
            .map_err(|e| Error::Config(format!("Invalid database URL: {}", e)))?;

        info!(
            max = settings.max_connections,
            min = settings.min_connections,
            "Database pool configured"
        );

        Ok(Self {
            pool,
            metrics: Arc::new(PoolMetrics::new()),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }

    /// Check a connection out of the pool.
    ///
    /// Fails with [`Error::PoolTimeout`] once the acquire timeout elapses, so a
    /// saturated pool never parks a caller forever.
    pub async fn acquire(&self) -> Result<Connection> {
        let result = self.pool.acquire().await;
        self.refresh_pool_gauges();

        match result {
            Ok(conn) => {
                self.metrics.record_acquired();
                Ok(conn)
            }
            Err(sqlx::Error::PoolTimedOut) => {
                self.metrics.record_timeout();
                warn!(
                    size = self.pool.size(),
                    idle = self.pool.num_idle(),
                    "Timed out waiting for a pooled connection"
                );
                Err(Error::PoolTimeout(
                    "no connection available within the acquire timeout".to_string(),
                ))
            }
            Err(e) => {
                self.metrics.record_failed();
                Err(db_error("Failed to acquire connection", e))
            }
        }
    }

    /// Sync the pool gauges with the pool's current state
    pub fn refresh_pool_gauges(&self) {
        self.metrics
            .set_pool_state(self.pool.size(), self.pool.num_idle());
    }

    /// Check database health
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.acquire().await?;

        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("Health check failed", e))?;

        debug!("Database health check passed");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections up to `timeout`.
    /// Returns false when the wait was cut short.
    pub async fn close(&self, timeout: Duration) -> bool {
        info!(timeout_ms = timeout.as_millis() as u64, "Closing database pool");
        match tokio::time::timeout(timeout, self.pool.close()).await {
            Ok(()) => {
                info!("Database pool closed");
                true
            }
            Err(_) => {
                warn!("Database pool did not drain before the destroy timeout");
                false
            }
        }
    }
}

#[async_trait]
impl Dependency for Db {
    fn name(&self) -> &str {
        "database"
    }

    async fn ping(&self) -> Result<()> {
        self.health_check().await
    }

    fn refresh_metrics(&self) {
        self.refresh_pool_gauges();
    }
}

/// Translate a driver error, keeping pool timeouts distinguishable
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::PoolTimedOut => Error::PoolTimeout(context.to_string()),
        other => Error::Database(format!("{}: {}", context, other)),
    }
}

/// True when the store rejected a write because a unique key already exists
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
