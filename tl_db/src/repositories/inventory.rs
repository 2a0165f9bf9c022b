//! ABOUTME: Inventory repository with stock reads, quantity updates and availability checks
//! ABOUTME: Owns the inventory table schema and its fixture rows

use crate::bootstrap::{count_rows, Bootstrap};
use crate::{db_error, Db};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{AnyConnection, FromRow};
use tl_core::{time::now_iso8601, Error, Result};
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Inventory entity; `product_id` is the business key
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price: f64,
    pub updated_at: String,
}

/// Result of an advisory stock check
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Availability {
    pub available: bool,
    pub product_id: i64,
    pub product_name: String,
    pub requested_quantity: i64,
    pub available_quantity: i64,
}

const COLUMNS: &str = "product_id, product_name, quantity, price, updated_at";

/// (product_id, product_name, quantity, price)
const FIXTURES: [(i64, &str, i64, f64); 5] = [
    (1, "Laptop", 50, 999.99),
    (2, "Mouse", 200, 29.99),
    (3, "Keyboard", 150, 79.99),
    (4, "Monitor", 75, 299.99),
    (5, "Headphones", 100, 149.99),
];

/// Schema and fixtures of the inventory table
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryBootstrap;

#[async_trait]
impl Bootstrap for InventoryBootstrap {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn schema(&self) -> &'static [&'static str] {
        &[r#"
            CREATE TABLE IF NOT EXISTS inventory (
                product_id BIGINT PRIMARY KEY,
                product_name TEXT NOT NULL,
                quantity BIGINT NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                price DOUBLE PRECISION NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "#]
    }

    async fn is_empty(&self, conn: &mut AnyConnection) -> Result<bool> {
        Ok(count_rows(conn, "inventory").await? == 0)
    }

    async fn seed(&self, conn: &mut AnyConnection) -> Result<u64> {
        let now = now_iso8601();
        let mut inserted = 0;

        for (product_id, product_name, quantity, price) in FIXTURES {
            let result = sqlx::query(
                r#"
                INSERT INTO inventory (product_id, product_name, quantity, price, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (product_id) DO NOTHING
                "#,
            )
            .bind(product_id)
            .bind(product_name)
            .bind(quantity)
            .bind(price)
            .bind(&now)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) if crate::is_unique_violation(&e) => {}
                Err(e) => return Err(db_error("Failed to seed inventory", e)),
            }
        }

        Ok(inserted)
    }
}

/// Inventory repository
pub struct InventoryRepository<'a> {
    db: &'a Db,
}

impl<'a> InventoryRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// All items ordered by product id
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<InventoryItem>> {
        let mut conn = self.db.acquire().await?;

        let sql = format!("SELECT {} FROM inventory ORDER BY product_id", COLUMNS);
        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch inventory", e))?;

        debug!("Found {} inventory items", items.len());
        Ok(items)
    }

    /// Find an item by product id
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, product_id: i64) -> Result<Option<InventoryItem>> {
        let mut conn = self.db.acquire().await?;

        let sql = format!("SELECT {} FROM inventory WHERE product_id = $1", COLUMNS);
        sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to fetch product", e))
    }

    /// Set the stock level of a product. Negative quantities never reach the store.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product_id: i64, quantity: i64) -> Result<InventoryItem> {
        if quantity < 0 {
            return Err(Error::Validation(
                "quantity must be a non-negative integer".to_string(),
            ));
        }

        let mut conn = self.db.acquire().await?;

        let sql = format!(
            "UPDATE inventory SET quantity = $1, updated_at = $2 WHERE product_id = $3 RETURNING {}",
            COLUMNS
        );
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(quantity)
            .bind(now_iso8601())
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to update inventory", e))?
            .ok_or_else(|| Error::NotFound("Product not found".to_string()))?;

        debug!(product_id, quantity, "Inventory updated");
        Ok(item)
    }

    /// Compare requested quantity against current stock.
    ///
    /// Advisory only: nothing is reserved or locked, so two concurrent callers
    /// can both see `available: true` for the same units.
    #[instrument(skip(self))]
    pub async fn check_availability(&self, product_id: i64, requested: i64) -> Result<Availability> {
        let item = self
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| Error::NotFound("Product not found".to_string()))?;

        Ok(Availability {
            available: item.quantity >= requested,
            product_id: item.product_id,
            product_name: item.product_name,
            requested_quantity: requested,
            available_quantity: item.quantity,
        })
    }
}
