//! GraphQL input objects and mutation payloads.
//!
//! Prices and totals sent by clients are only compared against the
//! server-side computation; they never end up on an order.

use async_graphql::{ID, InputObject, Json, SimpleObject};
use chrono::{DateTime, Utc};

use order_desk_core::{CartId, FulfillmentGroupId, FulfillmentMethodId, OrderId, ProductId, ShopId, VariantId};

use super::types::Order;
use crate::models::{Address, FulfillmentType, PaymentMethodName};
use crate::services::orders::{
    NewFulfillmentGroup, NewOrder, NewOrderItem, NewPayment, OrderChanges,
};

// =============================================================================
// placeOrder
// =============================================================================

/// Input for `placeOrder`.
#[derive(Debug, Clone, InputObject)]
pub struct PlaceOrderInput {
    /// Echoed back unchanged in the payload.
    pub client_mutation_id: Option<String>,
    pub order: OrderInput,
    /// Payments covering the order total. May be omitted for free orders.
    pub payments: Option<Vec<PaymentInput>>,
}

/// The order to place.
#[derive(Debug, Clone, InputObject)]
pub struct OrderInput {
    /// Cart the order is placed from; deleted once the order exists.
    pub cart_id: Option<ID>,
    pub currency_code: String,
    pub email: String,
    pub fulfillment_groups: Vec<OrderFulfillmentGroupInput>,
    pub shop_id: ID,
}

/// A fulfillment group of the order being placed.
#[derive(Debug, Clone, InputObject)]
pub struct OrderFulfillmentGroupInput {
    pub data: Option<OrderFulfillmentGroupDataInput>,
    pub items: Vec<OrderFulfillmentGroupItemInput>,
    pub selected_fulfillment_method_id: ID,
    pub shop_id: ID,
    /// Total the client computed for the group.
    pub total_price: Option<f64>,
    #[graphql(name = "type")]
    pub fulfillment_type: FulfillmentType,
}

/// Fulfillment-type-specific data of a group.
#[derive(Debug, Clone, InputObject)]
pub struct OrderFulfillmentGroupDataInput {
    pub shipping_address: Option<Address>,
}

/// An order line.
#[derive(Debug, Clone, InputObject)]
pub struct OrderFulfillmentGroupItemInput {
    pub added_at: Option<DateTime<Utc>>,
    /// Unit price the client saw.
    pub price: f64,
    pub product_configuration: ProductConfigurationInput,
    pub quantity: i32,
}

/// Product and variant to order.
#[derive(Debug, Clone, InputObject)]
pub struct ProductConfigurationInput {
    pub product_id: ID,
    pub product_variant_id: ID,
}

/// A payment to authorize for the order.
#[derive(Debug, Clone, InputObject)]
pub struct PaymentInput {
    /// Amount to charge. Null takes whatever the other payments leave.
    pub amount: Option<f64>,
    pub billing_address: Option<Address>,
    /// Method-specific data, e.g. `{"fullName": "..."}` for `iou_example`.
    pub data: Option<Json<serde_json::Value>>,
    pub method: PaymentMethodName,
}

/// Result of `placeOrder`.
#[derive(Debug, Clone, SimpleObject)]
pub struct PlaceOrderPayload {
    pub client_mutation_id: Option<String>,
    pub orders: Vec<Order>,
    /// Grants read access to the orders when they were placed anonymously.
    pub token: Option<String>,
}

impl From<OrderInput> for NewOrder {
    fn from(input: OrderInput) -> Self {
        Self {
            shop_id: ShopId::new(input.shop_id.0),
            currency_code: input.currency_code,
            email: input.email,
            cart_id: input.cart_id.map(|id| CartId::new(id.0)),
            fulfillment_groups: input
                .fulfillment_groups
                .into_iter()
                .map(NewFulfillmentGroup::from)
                .collect(),
        }
    }
}

impl From<OrderFulfillmentGroupInput> for NewFulfillmentGroup {
    fn from(input: OrderFulfillmentGroupInput) -> Self {
        Self {
            shop_id: ShopId::new(input.shop_id.0),
            fulfillment_type: input.fulfillment_type,
            selected_fulfillment_method_id: FulfillmentMethodId::new(
                input.selected_fulfillment_method_id.0,
            ),
            shipping_address: input.data.and_then(|data| data.shipping_address),
            items: input.items.into_iter().map(NewOrderItem::from).collect(),
            total_price: input.total_price,
        }
    }
}

impl From<OrderFulfillmentGroupItemInput> for NewOrderItem {
    fn from(input: OrderFulfillmentGroupItemInput) -> Self {
        Self {
            product_id: ProductId::new(input.product_configuration.product_id.0),
            variant_id: VariantId::new(input.product_configuration.product_variant_id.0),
            quantity: input.quantity,
            price: input.price,
            added_at: input.added_at,
        }
    }
}

impl From<PaymentInput> for NewPayment {
    fn from(input: PaymentInput) -> Self {
        Self {
            method: input.method,
            amount: input.amount,
            billing_address: input.billing_address,
            data: input.data.map_or(serde_json::Value::Null, |Json(data)| data),
        }
    }
}

// =============================================================================
// updateOrder / updateOrderFulfillmentGroup
// =============================================================================

/// Input for `updateOrder`. Omitted fields are left unchanged.
#[derive(Debug, Clone, InputObject)]
pub struct UpdateOrderInput {
    pub client_mutation_id: Option<String>,
    pub order_id: ID,
    /// New workflow status, e.g. `coreOrderWorkflow/processing`.
    pub status: Option<String>,
    pub email: Option<String>,
}

impl UpdateOrderInput {
    pub(crate) fn into_parts(self) -> (Option<String>, OrderId, OrderChanges) {
        (
            self.client_mutation_id,
            OrderId::new(self.order_id.0),
            OrderChanges {
                status: self.status,
                email: self.email,
            },
        )
    }
}

/// Result of `updateOrder`.
#[derive(Debug, Clone, SimpleObject)]
pub struct UpdateOrderPayload {
    pub client_mutation_id: Option<String>,
    pub order: Order,
}

/// Input for `updateOrderFulfillmentGroup`.
#[derive(Debug, Clone, InputObject)]
pub struct UpdateOrderFulfillmentGroupInput {
    pub client_mutation_id: Option<String>,
    pub order_id: ID,
    pub order_fulfillment_group_id: ID,
    /// Carrier tracking reference. Null or blank clears it.
    pub tracking: Option<String>,
}

impl UpdateOrderFulfillmentGroupInput {
    pub(crate) fn ids(&self) -> (OrderId, FulfillmentGroupId) {
        (
            OrderId::new(self.order_id.as_str()),
            FulfillmentGroupId::new(self.order_fulfillment_group_id.as_str()),
        )
    }
}

/// Result of `updateOrderFulfillmentGroup`.
#[derive(Debug, Clone, SimpleObject)]
pub struct UpdateOrderFulfillmentGroupPayload {
    pub client_mutation_id: Option<String>,
    pub order: Order,
}
