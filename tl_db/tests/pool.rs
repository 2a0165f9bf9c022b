//! ABOUTME: Connection pool bound and release behavior
//! ABOUTME: Saturated pools time out instead of hanging and recover after release

use std::time::Duration;
use tl_core::Error;
use tl_db::{Db, PoolSettings};

fn small_pool(acquire_timeout: Duration) -> Db {
    let mut settings = PoolSettings::new(test_support::sqlite_test_url("pool"));
    settings.max_connections = 2;
    settings.min_connections = 0;
    settings.acquire_timeout = acquire_timeout;
    Db::connect_lazy(&settings).unwrap()
}

#[tokio::test]
async fn excess_acquire_times_out_then_recovers() {
    let db = small_pool(Duration::from_millis(200));

    let first = db.acquire().await.unwrap();
    let second = db.acquire().await.unwrap();

    let err = db.acquire().await.unwrap_err();
    assert!(matches!(err, Error::PoolTimeout(_)), "got {:?}", err);
    assert_eq!(db.metrics().connections_timeout.get(), 1);

    drop(first);
    let third = db.acquire().await.expect("released connection is reused");
    drop((second, third));
}

#[tokio::test]
async fn waiters_succeed_after_holders_release() {
    let db = small_pool(Duration::from_secs(2));
    let hold = Duration::from_millis(100);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move {
                let mut conn = db.acquire().await?;
                sqlx::query("SELECT 1")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| Error::Database(e.to_string()))?;
                tokio::time::sleep(hold).await;
                Ok::<_, Error>(())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().expect("every waiter is served within the timeout");
    }
    assert_eq!(db.metrics().connections_acquired.get(), 6);
    assert_eq!(db.metrics().connections_timeout.get(), 0);
}

#[tokio::test]
async fn pool_gauges_reflect_checked_out_connections() {
    let db = small_pool(Duration::from_secs(1));

    let conn = db.acquire().await.unwrap();
    db.refresh_pool_gauges();
    assert_eq!(db.metrics().connections_active.get(), 1);

    drop(conn);
    // release hands the connection back asynchronously
    tokio::time::sleep(Duration::from_millis(50)).await;
    db.refresh_pool_gauges();
    assert_eq!(db.metrics().connections_active.get(), 0);
}
