//! Cart references.
//!
//! Carts are owned by the cart subsystem; Order Desk only needs enough of a
//! cart to delete it once it has been turned into an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use order_desk_core::{AccountId, CartId, ShopId};

/// A shopping cart awaiting checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub shop_id: ShopId,
    pub account_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}
