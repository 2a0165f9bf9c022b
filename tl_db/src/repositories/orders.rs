//! ABOUTME: Order repository for placing and reading orders
//! ABOUTME: Owns the orders table schema; orders carry no fixture rows

use crate::bootstrap::{count_rows, Bootstrap};
use crate::{db_error, Db};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{AnyConnection, FromRow};
use tl_core::{time::now_iso8601, Error, Id, Result};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Most recent orders returned by a list call
pub const LIST_LIMIT: i64 = 100;

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    pub id: String,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub status: String,
    pub created_at: String,
}

/// Request to place an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

const COLUMNS: &str = "id, user_id, product_id, quantity, status, created_at";

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBootstrap;

#[async_trait]
impl Bootstrap for OrderBootstrap {
    fn name(&self) -> &'static str {
        "orders"
    }

    fn schema(&self) -> &'static [&'static str] {
        &[
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                user_id BIGINT NOT NULL,
                product_id BIGINT NOT NULL,
                quantity BIGINT NOT NULL CHECK (quantity > 0),
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at)",
        ]
    }

    async fn is_empty(&self, conn: &mut AnyConnection) -> Result<bool> {
        Ok(count_rows(conn, "orders").await? == 0)
    }

    async fn seed(&self, _conn: &mut AnyConnection) -> Result<u64> {
        Ok(0)
    }
}

/// Order repository
pub struct OrderRepository<'a> {
    db: &'a Db,
}

impl<'a> OrderRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Place an order in `pending` state
    #[instrument(skip(self, request))]
    pub async fn create(&self, request: CreateOrderRequest) -> Result<Order> {
        if request.quantity < 1 {
            return Err(Error::Validation("quantity must be at least 1".to_string()));
        }

        let id = Id::new().to_string();
        debug!("Creating order with id: {}", id);

        let mut conn = self.db.acquire().await?;

        let sql = format!(
            "INSERT INTO orders (id, user_id, product_id, quantity, status, created_at) \
             VALUES ($1, $2, $3, $4, 'pending', $5) RETURNING {}",
            COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(request.user_id)
            .bind(request.product_id)
            .bind(request.quantity)
            .bind(now_iso8601())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to create order", e))?;

        Ok(order)
    }

    /// Latest orders first, capped at [`LIST_LIMIT`]
    #[instrument(skip(self))]
    pub async fn list_recent(&self) -> Result<Vec<Order>> {
        let mut conn = self.db.acquire().await?;

        let sql = format!(
            "SELECT {} FROM orders ORDER BY created_at DESC, id DESC LIMIT $1",
            COLUMNS
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(LIST_LIMIT)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch orders", e))
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
        let mut conn = self.db.acquire().await?;

        let sql = format!("SELECT {} FROM orders WHERE id = $1", COLUMNS);
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch order", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PoolSettings, ResourceInitializer};
    use std::time::Duration;
    use tl_core::RetryPolicy;

    async fn ready_db() -> Db {
        let db = Db::connect_lazy(&PoolSettings::new(test_support::sqlite_test_url("orders")))
            .unwrap();
        let ready = ResourceInitializer::new(
            &db,
            &OrderBootstrap,
            RetryPolicy::fixed(1, Duration::from_millis(1)),
        )
        .initialize()
        .await
        .unwrap();
        assert_eq!(ready.seeded, 0);
        db
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = ready_db().await;
        let repo = OrderRepository::new(&db);

        let order = repo
            .create(CreateOrderRequest {
                user_id: 1,
                product_id: 2,
                quantity: 3,
            })
            .await
            .unwrap();
        assert_eq!(order.status, "pending");

        let found = repo.find_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(found.quantity, 3);
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let db = ready_db().await;
        let repo = OrderRepository::new(&db);

        let mut ids = Vec::new();
        for quantity in 1..=3 {
            let order = repo
                .create(CreateOrderRequest {
                    user_id: 7,
                    product_id: 1,
                    quantity,
                })
                .await
                .unwrap();
            ids.push(order.id);
        }

        let listed: Vec<_> = repo.list_recent().await.unwrap().into_iter().map(|o| o.id).collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let db = ready_db().await;
        let err = OrderRepository::new(&db)
            .create(CreateOrderRequest {
                user_id: 1,
                product_id: 1,
                quantity: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
