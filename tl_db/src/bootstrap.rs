//! ABOUTME: Resource initializer that prepares the store before traffic is served
//! ABOUTME: Retries schema-ensure and seeding under a bounded policy, then fails fast

use crate::{db_error, is_unique_violation, Db};
use async_trait::async_trait;
use sqlx::{AnyConnection, Connection as _};
use std::time::Duration;
use tl_core::{retry_until, Error, Result, RetryPolicy};
use tracing::{debug, error, info};

/// Schema and fixture rows owned by one service.
///
/// Every statement must be idempotent: several replicas may run the same
/// bootstrap concurrently against one store without any coordination.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    /// Table this bootstrap owns, used in logs
    fn name(&self) -> &'static str;

    /// Create-if-absent DDL
    fn schema(&self) -> &'static [&'static str];

    /// True when no fixture rows exist yet
    async fn is_empty(&self, conn: &mut AnyConnection) -> Result<bool>;

    /// Insert fixture rows, each guarded by its unique key. Returns rows inserted.
    async fn seed(&self, conn: &mut AnyConnection) -> Result<u64>;

    /// Run the schema statements. A unique violation here means another
    /// replica created the same object first.
    async fn ensure_schema(&self, conn: &mut AnyConnection) -> Result<()> {
        for statement in self.schema() {
            match sqlx::query(statement).execute(&mut *conn).await {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    debug!(table = self.name(), "Schema object created concurrently");
                }
                Err(e) => {
                    return Err(Error::Database(format!(
                        "Failed to ensure {} schema: {}",
                        self.name(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a successful initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    /// Attempt on which the store became ready (1-based)
    pub attempts: u32,
    /// Fixture rows inserted by this process; 0 when already seeded
    pub seeded: u64,
}

/// Brings the store from unknown to ready, or reports that it never got there
pub struct ResourceInitializer<'a> {
    db: &'a Db,
    bootstrap: &'a dyn Bootstrap,
    policy: RetryPolicy,
    create_timeout: Duration,
}

impl<'a> ResourceInitializer<'a> {
    pub fn new(db: &'a Db, bootstrap: &'a dyn Bootstrap, policy: RetryPolicy) -> Self {
        Self {
            db,
            bootstrap,
            policy,
            create_timeout: Duration::from_secs(30),
        }
    }

    /// Bound on obtaining the connection for a single attempt
    pub fn with_create_timeout(mut self, create_timeout: Duration) -> Self {
        self.create_timeout = create_timeout;
        self
    }

    /// Run attempts until one succeeds. Exhaustion yields [`Error::Bootstrap`],
    /// after which the caller must not serve traffic.
    pub async fn initialize(&self) -> Result<Ready> {
        let table = self.bootstrap.name();
        info!(
            table,
            max_attempts = self.policy.max_attempts,
            delay_ms = self.policy.delay.as_millis() as u64,
            "Initializing database"
        );

        match retry_until(&self.policy, table, |attempt| self.attempt(attempt)).await {
            Ok(done) => {
                info!(
                    table,
                    attempts = done.attempts,
                    seeded = done.value,
                    "Database ready"
                );
                Ok(Ready {
                    attempts: done.attempts,
                    seeded: done.value,
                })
            }
            Err(exhausted) => {
                error!(
                    table,
                    attempts = exhausted.attempts,
                    error = %exhausted.last,
                    "Database initialization failed"
                );
                Err(Error::Bootstrap(format!(
                    "{} not ready after {} attempts: {}",
                    table, exhausted.attempts, exhausted.last
                )))
            }
        }
    }

    async fn attempt(&self, attempt: u32) -> Result<u64> {
        debug!(table = self.bootstrap.name(), attempt, "Bootstrap attempt");

        let mut conn = tokio::time::timeout(self.create_timeout, self.db.acquire())
            .await
            .map_err(|_| {
                Error::PoolTimeout(format!(
                    "connection not created within {}ms",
                    self.create_timeout.as_millis()
                ))
            })??;

        self.bootstrap.ensure_schema(&mut conn).await?;

        // emptiness check and seed commit together; a failed attempt leaves no rows
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin bootstrap transaction", e))?;

        let inserted = match self.seed_if_empty(&mut tx).await {
            Ok(inserted) => inserted,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    debug!(table = self.bootstrap.name(), error = %rollback, "Rollback failed");
                }
                return Err(e);
            }
        };

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit bootstrap transaction", e))?;

        if inserted > 0 {
            info!(table = self.bootstrap.name(), inserted, "Sample data inserted");
        }
        Ok(inserted)
    }

    async fn seed_if_empty(&self, conn: &mut AnyConnection) -> Result<u64> {
        if self.bootstrap.is_empty(conn).await? {
            self.bootstrap.seed(conn).await
        } else {
            debug!(table = self.bootstrap.name(), "Already seeded");
            Ok(0)
        }
    }
}

/// Count rows in `table`; used by bootstraps for the emptiness check
pub(crate) async fn count_rows(conn: &mut AnyConnection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| Error::Database(format!("Failed to count {}: {}", table, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InventoryBootstrap, PoolSettings};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_first_attempt_seeds() {
        let db = Db::connect_lazy(&PoolSettings::new(test_support::sqlite_test_url("boot")))
            .unwrap();
        let ready = ResourceInitializer::new(&db, &InventoryBootstrap, fast_policy(3))
            .initialize()
            .await
            .unwrap();

        assert_eq!(ready, Ready { attempts: 1, seeded: 5 });
    }

    #[tokio::test]
    async fn test_exhaustion_is_bootstrap_error() {
        let db = Db::connect_lazy(&PoolSettings::new(test_support::unreachable_sqlite_url()))
            .unwrap();
        let err = ResourceInitializer::new(&db, &InventoryBootstrap, fast_policy(2))
            .initialize()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Bootstrap(ref msg) if msg.contains("after 2 attempts")));
    }
}
