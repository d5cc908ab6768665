//! `PostgreSQL` store.
//!
//! Orders are kept whole in a JSONB `document` column. The columns next to
//! it duplicate the fields that lookups and listings filter on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use order_desk_core::{AccountId, CartId, OrderId, ShopId};

use super::{CartStore, OrderFilter, OrderStore, RepositoryError};
use crate::models::{Cart, Order};

/// Store backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map unique violations to `Conflict`.
fn map_insert_error(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict(format!(
                "{what} violates {}",
                db_err.constraint().unwrap_or("a unique constraint")
            ))
        }
        _ => RepositoryError::Database(err),
    }
}

fn decode_order(document: serde_json::Value) -> Result<Order, RepositoryError> {
    serde_json::from_value(document)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid order document: {e}")))
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO order_desk.orders
                (id, reference_id, shop_id, account_id, status, created_at, updated_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(order.id.as_str())
        .bind(&order.reference_id)
        .bind(order.shop_id.as_str())
        .bind(order.account_id.as_ref().map(AccountId::as_str))
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(Json(order))
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "order"))?;
        Ok(())
    }

    async fn order_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let document: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM order_desk.orders WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        document.map(decode_order).transpose()
    }

    async fn order_by_reference_id(
        &self,
        shop_id: &ShopId,
        reference_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let document: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT document FROM order_desk.orders WHERE shop_id = $1 AND reference_id = $2",
        )
        .bind(shop_id.as_str())
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await?;
        document.map(decode_order).transpose()
    }

    async fn orders_by_account_id(
        &self,
        account_id: &AccountId,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, RepositoryError> {
        let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
        let shop_ids: Vec<&str> = filter.shop_ids.iter().map(ShopId::as_str).collect();

        let documents: Vec<serde_json::Value> = sqlx::query_scalar(
            r"
            SELECT document
            FROM order_desk.orders
            WHERE account_id = $1
              AND (cardinality($2::text[]) = 0 OR status = ANY($2))
              AND (cardinality($3::text[]) = 0 OR shop_id = ANY($3))
            ",
        )
        .bind(account_id.as_str())
        .bind(&statuses)
        .bind(&shop_ids)
        .fetch_all(&self.pool)
        .await?;

        documents.into_iter().map(decode_order).collect()
    }

    async fn update_order(
        &self,
        order: &Order,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE order_desk.orders
            SET status = $2, updated_at = $3, document = $4
            WHERE id = $1 AND updated_at = $5
            ",
        )
        .bind(order.id.as_str())
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(Json(order))
        .bind(expected_updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM order_desk.orders WHERE id = $1")
                .bind(order.id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        match exists {
            Some(_) => Err(RepositoryError::Conflict(format!(
                "order {} was modified concurrently",
                order.id
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO order_desk.carts (id, shop_id, account_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(cart.id.as_str())
        .bind(cart.shop_id.as_str())
        .bind(cart.account_id.as_ref().map(AccountId::as_str))
        .bind(cart.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "cart"))?;
        Ok(())
    }

    async fn cart_by_id(&self, id: &CartId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<(String, String, Option<String>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, shop_id, account_id, created_at FROM order_desk.carts WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, shop_id, account_id, created_at)| Cart {
            id: CartId::new(id),
            shop_id: ShopId::new(shop_id),
            account_id: account_id.map(AccountId::new),
            created_at,
        }))
    }

    async fn delete_cart(&self, id: &CartId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM order_desk.carts WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
