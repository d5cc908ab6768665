//! In-process store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use order_desk_core::{AccountId, CartId, OrderId, ShopId};

use super::{CartStore, OrderFilter, OrderStore, RepositoryError};
use crate::models::{Cart, Order};

/// Orders and carts held in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    carts: RwLock<HashMap<CartId, Cart>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        if orders
            .values()
            .any(|existing| existing.reference_id == order.reference_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "reference id {} already exists",
                order.reference_id
            )));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn order_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn order_by_reference_id(
        &self,
        shop_id: &ShopId,
        reference_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|order| &order.shop_id == shop_id && order.reference_id == reference_id)
            .cloned())
    }

    async fn orders_by_account_id(
        &self,
        account_id: &AccountId,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.account_id.as_ref() == Some(account_id))
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    async fn update_order(
        &self,
        order: &Order,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order.id).ok_or(RepositoryError::NotFound)?;
        if stored.updated_at != expected_updated_at {
            return Err(RepositoryError::Conflict(format!(
                "order {} was modified concurrently",
                order.id
            )));
        }
        *stored = order.clone();
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        if carts.contains_key(&cart.id) {
            return Err(RepositoryError::Conflict(format!(
                "cart {} already exists",
                cart.id
            )));
        }
        carts.insert(cart.id.clone(), cart.clone());
        Ok(())
    }

    async fn cart_by_id(&self, id: &CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(id).cloned())
    }

    async fn delete_cart(&self, id: &CartId) -> Result<bool, RepositoryError> {
        Ok(self.carts.write().await.remove(id).is_some())
    }
}
