//! Order persistence.
//!
//! # Backends
//!
//! - [`memory::MemoryStore`] keeps everything in process. Used when no
//!   database URL is configured and by the test suites.
//! - [`postgres::PgStore`] stores orders as JSONB documents alongside the
//!   columns queries filter on.
//!
//! # Database: `order_desk`
//!
//! ## Tables
//!
//! - `orders` - Order documents (indexed by reference, shop, account, status)
//! - `carts` - Carts awaiting checkout, deleted once they become orders
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p order-desk-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use order_desk_core::{AccountId, CartId, OrderId, OrderStatus, ShopId};

use crate::models::{Cart, Order};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Migrations embedded at compile time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or concurrent modification.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// The current time at the microsecond precision `PostgreSQL` keeps, so a
/// timestamp read back compares equal to the one written.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Restricts which of an account's orders are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Empty means any status.
    pub statuses: Vec<OrderStatus>,
    /// Empty means any shop.
    pub shop_ids: Vec<ShopId>,
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && (self.shop_ids.is_empty() || self.shop_ids.contains(&order.shop_id))
    }
}

/// Storage for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order.
    ///
    /// Returns `RepositoryError::Conflict` when the ID or reference ID is
    /// already taken.
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn order_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn order_by_reference_id(
        &self,
        shop_id: &ShopId,
        reference_id: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Every order of `account_id` that passes `filter`, in no particular order.
    async fn orders_by_account_id(
        &self,
        account_id: &AccountId,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Replace an order, provided it has not changed since it was read.
    ///
    /// `expected_updated_at` is the `updated_at` of the copy the caller
    /// modified. Returns `RepositoryError::Conflict` when the stored copy is
    /// newer and `RepositoryError::NotFound` when it no longer exists.
    async fn update_order(
        &self,
        order: &Order,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Storage for carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn insert_cart(&self, cart: &Cart) -> Result<(), RepositoryError>;

    async fn cart_by_id(&self, id: &CartId) -> Result<Option<Cart>, RepositoryError>;

    /// Delete a cart. Returns whether it existed.
    async fn delete_cart(&self, id: &CartId) -> Result<bool, RepositoryError>;
}

/// A backend providing every store.
pub trait Store: OrderStore + CartStore {}

impl<T: OrderStore + CartStore> Store for T {}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let order = memory::tests::sample_order("acct", "shop-1", OrderStatus::Completed);
        assert!(OrderFilter::default().matches(&order));
    }

    #[test]
    fn test_filter_by_status_and_shop() {
        let order = memory::tests::sample_order("acct", "shop-1", OrderStatus::New);
        let by_status = OrderFilter {
            statuses: vec![OrderStatus::Canceled],
            shop_ids: Vec::new(),
        };
        assert!(!by_status.matches(&order));

        let by_shop = OrderFilter {
            statuses: vec![OrderStatus::New, OrderStatus::Processing],
            shop_ids: vec![ShopId::new("shop-1")],
        };
        assert!(by_shop.matches(&order));

        let other_shop = OrderFilter {
            statuses: Vec::new(),
            shop_ids: vec![ShopId::new("shop-2")],
        };
        assert!(!other_shop.matches(&order));
    }
}
