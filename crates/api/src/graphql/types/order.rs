//! GraphQL objects for orders.
//!
//! Each object wraps the persisted model and resolves fields from it.
//! Nested lists (`OrderFulfillmentGroup.items`, `OrderItem.productTags`) are
//! paginated here, from the copy already loaded with the order.

use async_graphql::{Context, Enum, ID, Object, SimpleObject, Union};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;

use order_desk_core::pagination::paginate;

use super::common::{Account, Money, Shop, SortOrder, define_connection, page_request};
use super::tag::{TagConnection, TagSortByField};
use crate::graphql::{IntoGraphqlResult, app_state};
use crate::models::{self, Address, FulfillmentData, FulfillmentType, ImageSizes, ItemAttribute};
use crate::services::catalog;

// =============================================================================
// Order
// =============================================================================

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order(pub models::Order);

impl From<models::Order> for Order {
    fn from(order: models::Order) -> Self {
        Self(order)
    }
}

#[Object]
impl Order {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    /// Owning account; null for orders placed without signing in.
    async fn account(&self) -> Option<Account> {
        self.0.account_id.clone().map(Account)
    }

    /// Cart the order was placed from.
    async fn cart_id(&self) -> Option<ID> {
        self.0.cart_id.as_ref().map(|id| ID::from(id.as_str()))
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }

    /// Status label translated to `language`, falling back to English.
    async fn display_status(&self, language: String) -> &'static str {
        self.0.status.label(&language)
    }

    async fn email(&self) -> Option<&str> {
        self.0.email.as_ref().map(order_desk_core::Email::as_str)
    }

    async fn fulfillment_groups(&self) -> Vec<OrderFulfillmentGroup> {
        self.0
            .fulfillment_groups
            .iter()
            .cloned()
            .map(OrderFulfillmentGroup)
            .collect()
    }

    async fn notes(&self) -> Vec<OrderNote> {
        self.0.notes.iter().cloned().map(OrderNote).collect()
    }

    async fn payments(&self) -> Vec<Payment> {
        self.0.payments.iter().cloned().map(Payment).collect()
    }

    /// Customer-facing identifier, distinct from `_id`.
    async fn reference_id(&self) -> &str {
        &self.0.reference_id
    }

    async fn shop(&self) -> Shop {
        Shop(self.0.shop_id.clone())
    }

    /// Workflow status, labelled in the shop's default language.
    async fn status(&self, ctx: &Context<'_>) -> async_graphql::Result<OrderStatus> {
        let state = app_state(ctx)?;
        let language = state
            .catalog()
            .shop(&self.0.shop_id)
            .map_or("en", |shop| shop.default_language.as_str());
        Ok(OrderStatus {
            label: self.0.status.label(language).to_owned(),
            status: self.0.status.as_str().to_owned(),
        })
    }

    async fn summary(&self) -> OrderSummary {
        OrderSummary(self.0.summary())
    }

    async fn total_item_quantity(&self) -> i32 {
        graphql_int(self.0.total_item_quantity())
    }
}

/// Workflow status of an order.
#[derive(Debug, Clone, SimpleObject)]
pub struct OrderStatus {
    /// Human readable status.
    pub label: String,
    /// Machine status, e.g. `coreOrderWorkflow/processing`.
    pub status: String,
}

/// A note left on an order.
#[derive(Debug, Clone)]
pub struct OrderNote(pub models::OrderNote);

#[Object]
impl OrderNote {
    async fn account(&self) -> Account {
        Account(self.0.account_id.clone())
    }

    async fn content(&self) -> &str {
        &self.0.content
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }
}

/// Monetary totals of an order or fulfillment group.
#[derive(Debug, Clone, Copy)]
pub struct OrderSummary(pub models::OrderSummary);

#[Object]
impl OrderSummary {
    async fn discount_total(&self) -> Money {
        self.0.discount_total.into()
    }

    /// `taxTotal / taxableAmount`.
    async fn effective_tax_rate(&self) -> f64 {
        self.0.effective_tax_rate.to_f64().unwrap_or_default()
    }

    async fn fulfillment_total(&self) -> Money {
        self.0.fulfillment_total.into()
    }

    async fn item_total(&self) -> Money {
        self.0.item_total.into()
    }

    async fn tax_total(&self) -> Money {
        self.0.tax_total.into()
    }

    async fn taxable_amount(&self) -> Money {
        self.0.taxable_amount.into()
    }

    async fn total(&self) -> Money {
        self.0.total.into()
    }
}

// =============================================================================
// Payments
// =============================================================================

/// A payment method.
#[derive(Debug, Clone, SimpleObject)]
pub struct PaymentMethod {
    pub name: String,
    pub display_name: String,
    pub is_enabled: bool,
}

/// A payment authorized for an order.
#[derive(Debug, Clone)]
pub struct Payment(pub models::Payment);

#[Object]
impl Payment {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    async fn amount(&self) -> Money {
        self.0.amount.into()
    }

    async fn billing_address(&self) -> Option<&Address> {
        self.0.billing_address.as_ref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn display_name(&self) -> &str {
        &self.0.display_name
    }

    async fn method(&self) -> PaymentMethod {
        PaymentMethod {
            name: self.0.method.as_str().to_owned(),
            display_name: self.0.method.display_name().to_owned(),
            is_enabled: true,
        }
    }

    async fn processor(&self) -> &str {
        &self.0.processor
    }

    /// `created` once authorized, `voided` once released.
    async fn status(&self) -> &'static str {
        self.0.status.as_str()
    }

    async fn transaction_id(&self) -> Option<&str> {
        self.0.transaction_id.as_deref()
    }
}

// =============================================================================
// Fulfillment groups
// =============================================================================

/// Fields fulfillment group items can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum OrderFulfillmentGroupItemsSortByField {
    #[graphql(name = "_id")]
    Id,
    #[graphql(name = "addedAt")]
    AddedAt,
}

/// Data of a shipping fulfillment group.
#[derive(Debug, Clone, SimpleObject)]
pub struct ShippingOrderFulfillmentGroupData {
    pub shipping_address: Address,
}

/// Fulfillment-type-specific data of a group.
#[derive(Debug, Clone, Union)]
pub enum OrderFulfillmentGroupData {
    Shipping(ShippingOrderFulfillmentGroupData),
}

/// A way of getting items to the customer.
#[derive(Debug, Clone)]
pub struct FulfillmentMethod(pub models::SelectedFulfillmentMethod);

#[Object]
impl FulfillmentMethod {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.method_id.as_str())
    }

    async fn carrier(&self) -> Option<&str> {
        self.0.carrier.as_deref()
    }

    async fn display_name(&self) -> &str {
        &self.0.display_name
    }

    async fn fulfillment_types(&self) -> &[FulfillmentType] {
        &self.0.fulfillment_types
    }

    async fn group(&self) -> Option<&str> {
        self.0.group.as_deref()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }
}

/// The fulfillment method chosen for a group and what it costs.
#[derive(Debug, Clone)]
pub struct FulfillmentOption(pub models::SelectedFulfillmentMethod);

#[Object]
impl FulfillmentOption {
    async fn fulfillment_method(&self) -> FulfillmentMethod {
        FulfillmentMethod(self.0.clone())
    }

    async fn handling_price(&self) -> Money {
        self.0.handling.into()
    }

    async fn price(&self) -> Money {
        self.0.rate.into()
    }
}

/// Items of an order fulfilled together.
#[derive(Debug, Clone)]
pub struct OrderFulfillmentGroup(pub models::FulfillmentGroup);

#[Object]
impl OrderFulfillmentGroup {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    async fn data(&self) -> OrderFulfillmentGroupData {
        match &self.0.data {
            FulfillmentData::Shipping { shipping_address } => {
                OrderFulfillmentGroupData::Shipping(ShippingOrderFulfillmentGroupData {
                    shipping_address: shipping_address.clone(),
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn items(
        &self,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        offset: Option<i32>,
        #[graphql(default_with = "SortOrder::Asc")] sort_order: SortOrder,
        #[graphql(default_with = "OrderFulfillmentGroupItemsSortByField::AddedAt")]
        sort_by: OrderFulfillmentGroupItemsSortByField,
    ) -> async_graphql::Result<OrderItemConnection> {
        let request = page_request(after, before, first, last, offset);
        let items = self.0.items.clone();
        let order = sort_order.into();
        let page = match sort_by {
            OrderFulfillmentGroupItemsSortByField::Id => {
                paginate(items, |_| (), item_id, order, &request)
            }
            OrderFulfillmentGroupItemsSortByField::AddedAt => {
                paginate(items, |item| item.added_at, item_id, order, &request)
            }
        }
        .into_gql()?;
        Ok(OrderItemConnection::from_page(page))
    }

    async fn selected_fulfillment_option(&self) -> FulfillmentOption {
        FulfillmentOption(self.0.fulfillment_method.clone())
    }

    async fn shop(&self) -> Shop {
        Shop(self.0.shop_id.clone())
    }

    async fn summary(&self) -> OrderSummary {
        OrderSummary(self.0.summary)
    }

    async fn total_item_quantity(&self) -> i32 {
        graphql_int(self.0.total_item_quantity())
    }

    /// Carrier tracking reference.
    async fn tracking(&self) -> Option<&str> {
        self.0.tracking.as_deref()
    }

    #[graphql(name = "type")]
    async fn fulfillment_type(&self) -> FulfillmentType {
        self.0.data.fulfillment_type()
    }
}

// =============================================================================
// Items
// =============================================================================

/// Product and variant an order line was bought as.
#[derive(Debug, Clone, SimpleObject)]
pub struct ProductConfiguration {
    pub product_id: ID,
    pub product_variant_id: ID,
}

/// A line of an order.
#[derive(Debug, Clone)]
pub struct OrderItem(pub models::OrderItem);

impl From<models::OrderItem> for OrderItem {
    fn from(item: models::OrderItem) -> Self {
        Self(item)
    }
}

#[Object]
impl OrderItem {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    async fn added_at(&self) -> Option<DateTime<Utc>> {
        self.0.added_at
    }

    async fn attributes(&self) -> &[ItemAttribute] {
        &self.0.attributes
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }

    #[graphql(name = "imageURLs")]
    async fn image_urls(&self) -> Option<&ImageSizes> {
        self.0.image_urls.as_ref()
    }

    async fn is_taxable(&self) -> bool {
        self.0.is_taxable
    }

    /// Unit price.
    async fn price(&self) -> Money {
        self.0.price.into()
    }

    async fn product_configuration(&self) -> ProductConfiguration {
        ProductConfiguration {
            product_id: ID::from(self.0.product_id.as_str()),
            product_variant_id: ID::from(self.0.variant_id.as_str()),
        }
    }

    async fn product_slug(&self) -> Option<&str> {
        self.0.product_slug.as_deref()
    }

    #[allow(clippy::too_many_arguments)]
    async fn product_tags(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        offset: Option<i32>,
        #[graphql(default_with = "SortOrder::Asc")] sort_order: SortOrder,
        #[graphql(default_with = "TagSortByField::Id")] sort_by: TagSortByField,
    ) -> async_graphql::Result<TagConnection> {
        let state = app_state(ctx)?;
        let tags = state.catalog().tags_by_ids(&self.0.product_tag_ids);
        let request = page_request(after, before, first, last, offset);
        let order = sort_order.into();
        let page = match sort_by {
            TagSortByField::Id => paginate(tags, |_| (), tag_id, order, &request),
            TagSortByField::Name => paginate(tags, |tag| tag.name.clone(), tag_id, order, &request),
            TagSortByField::Position => paginate(tags, |tag| tag.position, tag_id, order, &request),
        }
        .into_gql()?;
        Ok(TagConnection::from_page(page))
    }

    async fn product_type(&self) -> Option<&str> {
        self.0.product_type.as_deref()
    }

    async fn product_vendor(&self) -> Option<&str> {
        self.0.product_vendor.as_deref()
    }

    async fn quantity(&self) -> i32 {
        graphql_int(self.0.quantity)
    }

    async fn shop(&self) -> Shop {
        Shop(self.0.shop_id.clone())
    }

    /// `price * quantity`.
    async fn subtotal(&self) -> Money {
        self.0.subtotal.into()
    }

    async fn tax(&self) -> Money {
        self.0.tax.into()
    }

    async fn tax_code(&self) -> Option<&str> {
        self.0.tax_code.as_deref()
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn variant_title(&self) -> Option<&str> {
        self.0.variant_title.as_deref()
    }
}

/// GraphQL `Int` is 32-bit signed; larger counts are clamped.
fn graphql_int(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn item_id(item: &models::OrderItem) -> &str {
    item.id.as_str()
}

fn tag_id(tag: &catalog::Tag) -> &str {
    tag.id.as_str()
}

define_connection!(
    /// A page of fulfillment group items.
    OrderItemConnection,
    OrderItemEdge,
    OrderItem
);

// =============================================================================
// Account order listing
// =============================================================================

/// Fields an account's orders can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum OrdersByAccountIdSortByField {
    #[graphql(name = "_id")]
    Id,
    #[graphql(name = "createdAt")]
    CreatedAt,
}

impl From<OrdersByAccountIdSortByField> for crate::services::orders::OrderSortField {
    fn from(field: OrdersByAccountIdSortByField) -> Self {
        match field {
            OrdersByAccountIdSortByField::Id => Self::Id,
            OrdersByAccountIdSortByField::CreatedAt => Self::CreatedAt,
        }
    }
}

define_connection!(
    /// A page of an account's orders.
    OrdersByAccountIdConnection,
    OrdersByAccountIdEdge,
    Order
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_fit_graphql_int() {
        assert_eq!(graphql_int(3), 3);
        assert_eq!(graphql_int(u32::MAX), i32::MAX);
    }
}
