//! Order documents.

use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use order_desk_core::{
    AccountId, CartId, CurrencyCode, Email, FulfillmentGroupId, FulfillmentMethodId, Money,
    OrderId, OrderItemId, OrderStatus, PaymentId, ProductId, ShopId, TagId, VariantId,
};

// =============================================================================
// Shared value types
// =============================================================================

/// Postal address used for shipping and billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject, InputObject)]
#[graphql(input_name = "AddressInput")]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub company: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    pub full_name: String,
    pub phone: String,
    pub postal: String,
    pub region: String,
}

/// URLs of a product image at several sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[serde(default)]
pub struct ImageSizes {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub original: Option<String>,
    pub small: Option<String>,
    pub thumbnail: Option<String>,
}

/// A variant option shown on an order line, e.g. `Size: M`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[graphql(name = "OrderItemAttribute")]
pub struct ItemAttribute {
    pub label: Option<String>,
    pub value: Option<String>,
}

/// How a fulfillment group reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[graphql(rename_items = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentType {
    Shipping,
}

/// Payment methods a client can pay with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[graphql(rename_items = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodName {
    /// No payment; only valid for orders totalling zero.
    None,
    /// Example "I owe you" method that authorizes immediately.
    IouExample,
}

impl PaymentMethodName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::IouExample => "iou_example",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "No payment",
            Self::IouExample => "IOU",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Monetary totals for a fulfillment group or a whole order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub discount_total: Money,
    /// `tax_total / taxable_amount`, zero when nothing is taxable.
    pub effective_tax_rate: Decimal,
    pub fulfillment_total: Money,
    pub item_total: Money,
    pub tax_total: Money,
    pub taxable_amount: Money,
    pub total: Money,
}

impl OrderSummary {
    /// A summary with every amount at zero.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        let zero = Money::zero(currency_code);
        Self {
            discount_total: zero,
            effective_tax_rate: Decimal::ZERO,
            fulfillment_total: zero,
            item_total: zero,
            tax_total: zero,
            taxable_amount: zero,
            total: zero,
        }
    }

    /// Element-wise sum of several summaries in the same currency.
    #[must_use]
    pub fn combine<'a>(
        currency_code: CurrencyCode,
        summaries: impl IntoIterator<Item = &'a Self>,
    ) -> Self {
        let add = |a: Money, b: Money| Money::new(a.amount + b.amount, currency_code);
        let mut combined = summaries
            .into_iter()
            .fold(Self::zero(currency_code), |acc, s| Self {
                discount_total: add(acc.discount_total, s.discount_total),
                effective_tax_rate: Decimal::ZERO,
                fulfillment_total: add(acc.fulfillment_total, s.fulfillment_total),
                item_total: add(acc.item_total, s.item_total),
                tax_total: add(acc.tax_total, s.tax_total),
                taxable_amount: add(acc.taxable_amount, s.taxable_amount),
                total: add(acc.total, s.total),
            });
        combined.effective_tax_rate =
            effective_rate(combined.tax_total.amount, combined.taxable_amount.amount);
        combined
    }
}

/// Add unit counts, saturating at `u32::MAX`.
fn sum_quantities(quantities: impl IntoIterator<Item = u32>) -> u32 {
    quantities.into_iter().fold(0, u32::saturating_add)
}

/// Tax divided by taxable amount, rounded to six places.
#[must_use]
pub fn effective_rate(tax: Decimal, taxable: Decimal) -> Decimal {
    if taxable.is_zero() {
        Decimal::ZERO
    } else {
        (tax / taxable).round_dp(6)
    }
}

/// Hash of a token that grants an anonymous buyer read access to their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousAccessToken {
    pub hashed_token: String,
    pub created_at: DateTime<Utc>,
}

/// A free-text note attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNote {
    pub account_id: AccountId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Customer-safe identifier, distinct from `id`.
    pub reference_id: String,
    pub shop_id: ShopId,
    /// `None` for orders placed without signing in.
    pub account_id: Option<AccountId>,
    pub cart_id: Option<CartId>,
    pub email: Option<Email>,
    pub currency_code: CurrencyCode,
    pub status: OrderStatus,
    pub fulfillment_groups: Vec<FulfillmentGroup>,
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub notes: Vec<OrderNote>,
    #[serde(default)]
    pub anonymous_access_tokens: Vec<AnonymousAccessToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Totals across all fulfillment groups.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::combine(
            self.currency_code,
            self.fulfillment_groups.iter().map(|group| &group.summary),
        )
    }

    /// Number of units across all fulfillment groups.
    #[must_use]
    pub fn total_item_quantity(&self) -> u32 {
        sum_quantities(
            self.fulfillment_groups
                .iter()
                .map(FulfillmentGroup::total_item_quantity),
        )
    }

    /// Find a fulfillment group by ID.
    pub fn fulfillment_group_mut(
        &mut self,
        id: &FulfillmentGroupId,
    ) -> Option<&mut FulfillmentGroup> {
        self.fulfillment_groups.iter_mut().find(|group| &group.id == id)
    }
}

// =============================================================================
// Fulfillment groups
// =============================================================================

/// Type-specific data of a fulfillment group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FulfillmentData {
    Shipping { shipping_address: Address },
}

impl FulfillmentData {
    #[must_use]
    pub const fn fulfillment_type(&self) -> FulfillmentType {
        match self {
            Self::Shipping { .. } => FulfillmentType::Shipping,
        }
    }
}

/// Snapshot of the fulfillment method chosen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFulfillmentMethod {
    pub method_id: FulfillmentMethodId,
    pub name: String,
    pub display_name: String,
    pub carrier: Option<String>,
    pub group: Option<String>,
    pub fulfillment_types: Vec<FulfillmentType>,
    pub rate: Money,
    pub handling: Money,
}

/// Items of an order fulfilled together through one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentGroup {
    pub id: FulfillmentGroupId,
    pub shop_id: ShopId,
    pub data: FulfillmentData,
    pub items: Vec<OrderItem>,
    pub fulfillment_method: SelectedFulfillmentMethod,
    pub summary: OrderSummary,
    pub tracking: Option<String>,
}

impl FulfillmentGroup {
    #[must_use]
    pub fn total_item_quantity(&self) -> u32 {
        sum_quantities(self.items.iter().map(|item| item.quantity))
    }
}

/// A line on an order: one product variant at a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub shop_id: ShopId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub added_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub variant_title: Option<String>,
    pub product_slug: Option<String>,
    pub product_type: Option<String>,
    pub product_vendor: Option<String>,
    #[serde(default)]
    pub product_tag_ids: Vec<TagId>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
    pub image_urls: Option<ImageSizes>,
    pub is_taxable: bool,
    pub tax_code: Option<String>,
    /// Unit price.
    pub price: Money,
    pub quantity: u32,
    /// `price * quantity`.
    pub subtotal: Money,
    pub tax: Money,
}

// =============================================================================
// Payments
// =============================================================================

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Authorized, not yet captured.
    Created,
    /// Authorization released.
    Voided,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Voided => "voided",
        }
    }
}

/// An authorized payment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub amount: Money,
    pub method: PaymentMethodName,
    pub display_name: String,
    pub processor: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub billing_address: Option<Address>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    fn summary(items: i64, shipping: i64, tax: i64, taxable: i64) -> OrderSummary {
        OrderSummary {
            discount_total: money(0),
            effective_tax_rate: effective_rate(money(tax).amount, money(taxable).amount),
            fulfillment_total: money(shipping),
            item_total: money(items),
            tax_total: money(tax),
            taxable_amount: money(taxable),
            total: money(items + shipping + tax),
        }
    }

    #[test]
    fn test_combine_sums_every_amount() {
        let a = summary(1000, 500, 100, 1000);
        let b = summary(2000, 0, 0, 0);
        let combined = OrderSummary::combine(CurrencyCode::USD, [&a, &b]);
        assert_eq!(combined.item_total, money(3000));
        assert_eq!(combined.fulfillment_total, money(500));
        assert_eq!(combined.tax_total, money(100));
        assert_eq!(combined.taxable_amount, money(1000));
        assert_eq!(combined.total, money(3600));
        assert_eq!(combined.effective_tax_rate, Decimal::new(1, 1));
    }

    #[test]
    fn test_combine_empty_is_zero() {
        let combined = OrderSummary::combine(CurrencyCode::EUR, []);
        assert_eq!(combined, OrderSummary::zero(CurrencyCode::EUR));
    }

    #[test]
    fn test_quantities_saturate() {
        assert_eq!(sum_quantities([2, 1]), 3);
        assert_eq!(sum_quantities([u32::MAX, 1, u32::MAX]), u32::MAX);
        assert_eq!(sum_quantities([]), 0);
    }

    #[test]
    fn test_effective_rate_without_taxable_amount() {
        assert_eq!(effective_rate(Decimal::ONE, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_fulfillment_data_serializes_with_type_tag() {
        let data = FulfillmentData::Shipping {
            shipping_address: Address {
                address1: "1 Main St".into(),
                address2: None,
                city: "Springfield".into(),
                company: None,
                country: "US".into(),
                full_name: "Pat Doe".into(),
                phone: "555-0100".into(),
                postal: "12345".into(),
                region: "OR".into(),
            },
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "shipping");
        assert_eq!(json["shipping_address"]["fullName"], "Pat Doe");
        assert_eq!(data.fulfillment_type(), FulfillmentType::Shipping);
    }
}
