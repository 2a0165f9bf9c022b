//! ABOUTME: Resource initializer behavior against real SQLite stores
//! ABOUTME: Retry until reachable, exhaustion timing, and seeding idempotence

use async_trait::async_trait;
use sqlx::AnyConnection;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tl_core::{Error, Result, RetryPolicy};
use tl_db::{
    Bootstrap, Db, InventoryBootstrap, InventoryRepository, PoolSettings, ResourceInitializer,
    UserBootstrap, UserRepository,
};

/// Inventory bootstrap whose store "comes up" only on attempt `ready_on`.
/// Earlier attempts fail halfway through seeding and leave their rows behind.
struct FlakyInventory {
    ready_on: u32,
    attempts: AtomicU32,
}

#[async_trait]
impl Bootstrap for FlakyInventory {
    fn name(&self) -> &'static str {
        InventoryBootstrap.name()
    }

    fn schema(&self) -> &'static [&'static str] {
        InventoryBootstrap.schema()
    }

    async fn is_empty(&self, conn: &mut AnyConnection) -> Result<bool> {
        InventoryBootstrap.is_empty(conn).await
    }

    async fn seed(&self, conn: &mut AnyConnection) -> Result<u64> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt < self.ready_on {
            // two of five fixtures land, then the connection drops
            for (id, name) in [(1, "Laptop"), (2, "Mouse")] {
                sqlx::query(
                    "INSERT INTO inventory (product_id, product_name, quantity, price, updated_at) \
                     VALUES ($1, $2, 1, 1.0, 'partial')",
                )
                .bind(id as i64)
                .bind(name)
                .execute(&mut *conn)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;
            }
            return Err(Error::Database("connection reset mid-seed".to_string()));
        }
        InventoryBootstrap.seed(conn).await
    }
}

fn sqlite_db(prefix: &str) -> Db {
    Db::connect_lazy(&PoolSettings::new(test_support::sqlite_test_url(prefix))).unwrap()
}

#[tokio::test]
async fn failed_attempts_leave_no_partial_fixtures() {
    let db = sqlite_db("flaky");
    let bootstrap = FlakyInventory {
        ready_on: 3,
        attempts: AtomicU32::new(0),
    };

    let ready = ResourceInitializer::new(
        &db,
        &bootstrap,
        RetryPolicy::fixed(5, Duration::from_millis(10)),
    )
    .initialize()
    .await
    .expect("store becomes ready on the third attempt");

    assert_eq!(ready.attempts, 3);
    assert_eq!(ready.seeded, 5);

    let items = InventoryRepository::new(&db).list().await.unwrap();
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|i| i.updated_at != "partial"));
    assert_eq!(items[0].quantity, 50);
    assert_eq!(items[1].quantity, 200);
}

#[tokio::test]
async fn unreachable_store_exhausts_after_exact_attempts() {
    let db = Db::connect_lazy(&PoolSettings::new(test_support::unreachable_sqlite_url())).unwrap();
    let interval = Duration::from_millis(50);
    let started = Instant::now();

    let err = ResourceInitializer::new(&db, &InventoryBootstrap, RetryPolicy::fixed(4, interval))
        .initialize()
        .await
        .unwrap_err();

    let elapsed = started.elapsed();
    assert!(matches!(err, Error::Bootstrap(ref m) if m.contains("after 4 attempts")));
    // three sleeps between four attempts
    assert!(elapsed >= interval * 3, "returned too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "took too long: {:?}", elapsed);
}

#[tokio::test]
async fn initializing_twice_never_duplicates_fixtures() {
    let url = test_support::sqlite_test_url("twice");
    let policy = RetryPolicy::fixed(1, Duration::from_millis(1));

    let first = Db::connect_lazy(&PoolSettings::new(url.clone())).unwrap();
    let ready = ResourceInitializer::new(&first, &UserBootstrap, policy.clone())
        .initialize()
        .await
        .unwrap();
    assert_eq!(ready.seeded, 5);

    // a second replica starting against the same store
    let second = Db::connect_lazy(&PoolSettings::new(url)).unwrap();
    let ready = ResourceInitializer::new(&second, &UserBootstrap, policy)
        .initialize()
        .await
        .unwrap();
    assert_eq!(ready.seeded, 0);

    assert_eq!(UserRepository::new(&second).list().await.unwrap().len(), 5);
}

#[tokio::test]
async fn seeding_over_existing_rows_is_swallowed() {
    let db = sqlite_db("reseed");
    ResourceInitializer::new(
        &db,
        &InventoryBootstrap,
        RetryPolicy::fixed(1, Duration::from_millis(1)),
    )
    .initialize()
    .await
    .unwrap();

    // force a seed while fixtures already exist, as a racing replica would
    let mut conn = db.acquire().await.unwrap();
    let inserted = InventoryBootstrap.seed(&mut conn).await.unwrap();
    assert_eq!(inserted, 0);
    drop(conn);

    assert_eq!(InventoryRepository::new(&db).list().await.unwrap().len(), 5);
}
