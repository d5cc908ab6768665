//! Order placement, updates and lookups.
//!
//! `place_order` runs in this order and stops at the first failure:
//!
//! 1. validate the input and resolve catalog data (shop, methods, variants)
//! 2. price every item and fulfillment group on the server
//! 3. split the order total across the submitted payments
//! 4. authorize the payments, voiding earlier ones if a later one fails
//! 5. insert the order, voiding every payment if the insert fails
//! 6. delete the cart the order came from
//!
//! Nothing is written before step 5, so a declined payment never leaves an
//! order behind.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use order_desk_core::pagination::{Page, PageRequest, SortOrder, paginate};
use order_desk_core::{
    AccountId, CartId, CurrencyCode, Email, FulfillmentGroupId, FulfillmentMethodId, Money,
    OrderId, OrderItemId, OrderStatus, PaymentId, ProductId, ShopId, VariantId,
};

use crate::db::{self, OrderFilter, RepositoryError, Store};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{
    Address, AnonymousAccessToken, FulfillmentData, FulfillmentGroup, FulfillmentType, Order,
    OrderItem, OrderSummary, Payment, PaymentMethodName, PaymentStatus, SelectedFulfillmentMethod,
};
use crate::services::access::{Viewer, hash_token};
use crate::services::catalog::{Catalog, Shop};
use crate::services::payments::{Authorization, AuthorizationRequest, PaymentMethodRegistry};
use crate::services::pricing::{amounts_match, item_subtotal, item_tax, summarize_group};
use crate::services::reference::{generate_access_token, generate_reference_id};

/// Attempts at finding an unused reference ID before giving up.
const REFERENCE_ID_ATTEMPTS: usize = 3;

/// Largest quantity accepted on a single order line.
pub const MAX_ITEM_QUANTITY: u32 = 10_000;

// =============================================================================
// Inputs and results
// =============================================================================

/// An order as submitted at checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shop_id: ShopId,
    pub currency_code: String,
    pub email: String,
    pub cart_id: Option<CartId>,
    pub fulfillment_groups: Vec<NewFulfillmentGroup>,
}

/// A fulfillment group as submitted at checkout.
#[derive(Debug, Clone)]
pub struct NewFulfillmentGroup {
    pub shop_id: ShopId,
    pub fulfillment_type: FulfillmentType,
    pub selected_fulfillment_method_id: FulfillmentMethodId,
    pub shipping_address: Option<Address>,
    pub items: Vec<NewOrderItem>,
    /// Total the client expects. Checked, never used.
    pub total_price: Option<f64>,
}

/// An order line as submitted at checkout.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i32,
    /// Unit price the client expects. Checked, never used.
    pub price: f64,
    pub added_at: Option<DateTime<Utc>>,
}

/// A payment as submitted at checkout.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub method: PaymentMethodName,
    /// `None` pays whatever the other payments leave.
    pub amount: Option<f64>,
    pub billing_address: Option<Address>,
    pub data: serde_json::Value,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// Access token for anonymous buyers. Returned once and never stored.
    pub token: Option<String>,
}

/// Changes an administrator can make to an order.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<String>,
    pub email: Option<String>,
}

/// Field an account's orders are sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSortField {
    Id,
    #[default]
    CreatedAt,
}

// =============================================================================
// Service
// =============================================================================

/// Order operations over a store, the catalog and the payment processors.
pub struct OrderService<'a> {
    store: &'a dyn Store,
    catalog: &'a Catalog,
    payments: &'a PaymentMethodRegistry,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        catalog: &'a Catalog,
        payments: &'a PaymentMethodRegistry,
    ) -> Self {
        Self {
            store,
            catalog,
            payments,
        }
    }

    /// Price, pay for and persist an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input or mismatched
    /// prices, `AppError::NotFound` for unknown catalog references,
    /// `AppError::Payment` when a payment fails, and `AppError::Database`
    /// when the order cannot be stored. No order exists after an error.
    #[tracing::instrument(skip_all, fields(shop_id = %input.shop_id))]
    pub async fn place_order(
        &self,
        viewer: &Viewer,
        input: NewOrder,
        payments: Vec<NewPayment>,
    ) -> Result<PlacedOrder> {
        let shop = self
            .catalog
            .shop(&input.shop_id)
            .ok_or_else(|| AppError::NotFound(format!("shop {}", input.shop_id)))?;
        let currency_code = resolve_currency(shop, &input.currency_code)?;
        let email = Email::parse(&input.email)?;

        if input.fulfillment_groups.is_empty() {
            return Err(AppError::BadRequest(
                "order must have at least one fulfillment group".to_owned(),
            ));
        }
        if let Some(cart_id) = &input.cart_id {
            self.check_cart(viewer, cart_id, &shop.id).await?;
        }

        let now = db::now();
        let fulfillment_groups = input
            .fulfillment_groups
            .iter()
            .map(|group| self.build_group(shop, currency_code, group, now))
            .collect::<Result<Vec<_>>>()?;
        let summary = OrderSummary::combine(
            currency_code,
            fulfillment_groups.iter().map(|group| &group.summary),
        );

        let requests = allocate_payments(&shop.id, summary.total, payments)?;
        let billing_addresses: Vec<Option<Address>> = requests
            .iter()
            .map(|(_, request)| request.billing_address.clone())
            .collect();
        let authorizations = self.payments.authorize_all(requests).await?;

        let token = viewer.account_id.is_none().then(generate_access_token);
        let mut order = Order {
            id: OrderId::generate(),
            reference_id: generate_reference_id(),
            shop_id: shop.id.clone(),
            account_id: viewer.account_id.clone(),
            cart_id: input.cart_id.clone(),
            email: Some(email),
            currency_code,
            status: OrderStatus::New,
            fulfillment_groups,
            payments: authorizations
                .iter()
                .zip(billing_addresses)
                .map(|(authorization, billing_address)| {
                    payment_record(authorization, billing_address, now)
                })
                .collect(),
            notes: Vec::new(),
            anonymous_access_tokens: token
                .iter()
                .map(|token| AnonymousAccessToken {
                    hashed_token: hash_token(token),
                    created_at: now,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.insert_with_fresh_reference(&mut order).await {
            self.payments.void_all(&authorizations).await;
            return Err(err);
        }

        tracing::info!(
            order_id = %order.id,
            reference_id = %order.reference_id,
            total = %summary.total.amount,
            currency = %currency_code,
            payments = order.payments.len(),
            "Order placed"
        );
        add_breadcrumb(
            "order",
            "Order placed",
            &[("order_id", order.id.as_str()), ("shop_id", order.shop_id.as_str())],
        );

        if let Some(cart_id) = &input.cart_id {
            self.delete_cart(cart_id).await;
        }

        Ok(PlacedOrder { order, token })
    }

    /// Change the status and/or email of an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown order,
    /// `AppError::Forbidden` unless the viewer administers the order's shop,
    /// and `AppError::BadRequest` for an unknown status or a transition the
    /// workflow does not allow.
    pub async fn update_order(
        &self,
        viewer: &Viewer,
        order_id: &OrderId,
        changes: OrderChanges,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        viewer.require_shop_admin(&order.shop_id)?;

        if let Some(raw) = changes.status {
            let next: OrderStatus = raw
                .parse()
                .map_err(|e: String| AppError::BadRequest(e))?;
            if next != order.status && !order.status.can_transition_to(next) {
                return Err(AppError::BadRequest(format!(
                    "cannot change order status from {} to {}",
                    order.status, next
                )));
            }
            order.status = next;
        }
        if let Some(raw) = changes.email {
            order.email = Some(Email::parse(&raw)?);
        }

        self.save(&mut order).await?;
        tracing::info!(order_id = %order.id, status = %order.status, "Order updated");
        Ok(order)
    }

    /// Set the tracking reference of a fulfillment group.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown order or group and
    /// `AppError::Forbidden` unless the viewer administers the order's shop.
    pub async fn update_fulfillment_group(
        &self,
        viewer: &Viewer,
        order_id: &OrderId,
        group_id: &FulfillmentGroupId,
        tracking: Option<String>,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        viewer.require_shop_admin(&order.shop_id)?;

        let group = order.fulfillment_group_mut(group_id).ok_or_else(|| {
            AppError::NotFound(format!("fulfillment group {group_id} on order {order_id}"))
        })?;
        group.tracking = tracking
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        self.save(&mut order).await?;
        tracing::info!(order_id = %order.id, group_id = %group_id, "Fulfillment group updated");
        Ok(order)
    }

    /// Look up an order by internal ID within a shop.
    ///
    /// Returns `None` when no such order exists in `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the order exists but the viewer
    /// may not read it.
    pub async fn order_by_id(
        &self,
        viewer: &Viewer,
        id: &OrderId,
        shop_id: &ShopId,
        token: Option<&str>,
    ) -> Result<Option<Order>> {
        let order = self
            .store
            .order_by_id(id)
            .await?
            .filter(|order| &order.shop_id == shop_id);
        authorize_read(viewer, order, token)
    }

    /// Look up an order by its customer-facing reference ID within a shop.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the order exists but the viewer
    /// may not read it.
    pub async fn order_by_reference_id(
        &self,
        viewer: &Viewer,
        reference_id: &str,
        shop_id: &ShopId,
        token: Option<&str>,
    ) -> Result<Option<Order>> {
        let order = self
            .store
            .order_by_reference_id(shop_id, reference_id)
            .await?;
        authorize_read(viewer, order, token)
    }

    /// One page of an account's orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless the viewer is the account or
    /// administers every shop in the filter, and `AppError::Pagination` for
    /// bad pagination arguments.
    pub async fn orders_by_account_id(
        &self,
        viewer: &Viewer,
        account_id: &AccountId,
        filter: &OrderFilter,
        sort_by: OrderSortField,
        sort_order: SortOrder,
        page: &PageRequest,
    ) -> Result<Page<Order>> {
        viewer.require_account_access(account_id, &filter.shop_ids)?;
        let orders = self.store.orders_by_account_id(account_id, filter).await?;
        let page = match sort_by {
            OrderSortField::Id => paginate(orders, |_| (), id_of, sort_order, page)?,
            OrderSortField::CreatedAt => {
                paginate(orders, |order| order.created_at, id_of, sort_order, page)?
            }
        };
        Ok(page)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn require_order(&self, id: &OrderId) -> Result<Order> {
        self.store
            .order_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    /// Bump `updated_at` and write the order back.
    async fn save(&self, order: &mut Order) -> Result<()> {
        let expected = order.updated_at;
        order.updated_at = db::now().max(expected + Duration::microseconds(1));
        self.store.update_order(order, expected).await?;
        Ok(())
    }

    async fn check_cart(&self, viewer: &Viewer, cart_id: &CartId, shop_id: &ShopId) -> Result<()> {
        let cart = self
            .store
            .cart_by_id(cart_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cart {cart_id}")))?;
        if &cart.shop_id != shop_id {
            return Err(AppError::BadRequest(format!(
                "cart {cart_id} belongs to another shop"
            )));
        }
        if cart
            .account_id
            .as_ref()
            .is_some_and(|owner| !viewer.is_account(owner))
        {
            return Err(AppError::Forbidden(format!(
                "cart {cart_id} belongs to another account"
            )));
        }
        Ok(())
    }

    async fn delete_cart(&self, cart_id: &CartId) {
        match self.store.delete_cart(cart_id).await {
            Ok(true) => tracing::debug!(cart_id = %cart_id, "Cart deleted"),
            Ok(false) => tracing::warn!(cart_id = %cart_id, "Cart already gone after order"),
            Err(err) => {
                tracing::error!(cart_id = %cart_id, error = %err, "Failed to delete cart");
            }
        }
    }

    /// Insert `order`, drawing a new reference ID when the current one is
    /// taken.
    async fn insert_with_fresh_reference(&self, order: &mut Order) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.store.insert_order(order).await {
                Ok(()) => return Ok(()),
                Err(RepositoryError::Conflict(reason)) if attempt < REFERENCE_ID_ATTEMPTS => {
                    tracing::warn!(attempt, %reason, "Order insert conflicted, retrying");
                    order.reference_id = generate_reference_id();
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn build_group(
        &self,
        shop: &Shop,
        currency_code: CurrencyCode,
        input: &NewFulfillmentGroup,
        now: DateTime<Utc>,
    ) -> Result<FulfillmentGroup> {
        if input.shop_id != shop.id {
            return Err(AppError::BadRequest(format!(
                "fulfillment group shop {} does not match order shop {}",
                input.shop_id, shop.id
            )));
        }
        if input.items.is_empty() {
            return Err(AppError::BadRequest(
                "fulfillment group must have at least one item".to_owned(),
            ));
        }

        let data = match input.fulfillment_type {
            FulfillmentType::Shipping => FulfillmentData::Shipping {
                shipping_address: input.shipping_address.clone().ok_or_else(|| {
                    AppError::BadRequest(
                        "shipping fulfillment group requires a shipping address".to_owned(),
                    )
                })?,
            },
        };

        let method = self
            .catalog
            .fulfillment_method(&shop.id, &input.selected_fulfillment_method_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "fulfillment method {}",
                    input.selected_fulfillment_method_id
                ))
            })?;
        if !method.fulfillment_types.contains(&input.fulfillment_type) {
            return Err(AppError::BadRequest(format!(
                "fulfillment method {} does not support this fulfillment type",
                method.id
            )));
        }
        let price = method.pricing.get(&currency_code).ok_or_else(|| {
            AppError::BadRequest(format!(
                "fulfillment method {} is not available in {currency_code}",
                method.id
            ))
        })?;
        let rate = Money::new(price.rate, currency_code);
        let handling = Money::new(price.handling, currency_code);

        let items = input
            .items
            .iter()
            .map(|item| self.build_item(shop, currency_code, item, now))
            .collect::<Result<Vec<_>>>()?;
        let summary = summarize_group(currency_code, &items, rate, handling);

        if let Some(client_total) = input.total_price {
            let client_total = client_money(client_total, currency_code, "totalPrice")?;
            if !amounts_match(client_total, summary.total) {
                return Err(AppError::BadRequest(format!(
                    "fulfillment group total {} does not match calculated total {}",
                    client_total.display(),
                    summary.total.display()
                )));
            }
        }

        Ok(FulfillmentGroup {
            id: FulfillmentGroupId::generate(),
            shop_id: shop.id.clone(),
            data,
            items,
            fulfillment_method: SelectedFulfillmentMethod {
                method_id: method.id.clone(),
                name: method.name.clone(),
                display_name: method.display_name.clone(),
                carrier: method.carrier.clone(),
                group: method.group.clone(),
                fulfillment_types: method.fulfillment_types.clone(),
                rate,
                handling,
            },
            summary,
            tracking: None,
        })
    }

    fn build_item(
        &self,
        shop: &Shop,
        currency_code: CurrencyCode,
        input: &NewOrderItem,
        now: DateTime<Utc>,
    ) -> Result<OrderItem> {
        let quantity = u32::try_from(input.quantity)
            .ok()
            .filter(|q| (1..=MAX_ITEM_QUANTITY).contains(q))
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "quantity must be between 1 and {MAX_ITEM_QUANTITY} (got {})",
                    input.quantity
                ))
            })?;

        let (product, variant) = self
            .catalog
            .variant(&input.product_id, &input.variant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "product {} variant {}",
                    input.product_id, input.variant_id
                ))
            })?;
        if product.shop_id != shop.id {
            return Err(AppError::BadRequest(format!(
                "product {} is not sold by shop {}",
                product.id, shop.id
            )));
        }
        let catalog_price = variant.prices.get(&currency_code).ok_or_else(|| {
            AppError::BadRequest(format!(
                "variant {} has no {currency_code} price",
                variant.id
            ))
        })?;
        let price = Money::new(*catalog_price, currency_code);

        let client_price = client_money(input.price, currency_code, "price")?;
        if !amounts_match(client_price, price) {
            return Err(AppError::BadRequest(format!(
                "price {} for variant {} does not match current price {}",
                client_price.display(),
                variant.id,
                price.display()
            )));
        }

        let is_taxable = variant.is_taxable.unwrap_or(product.is_taxable);
        let subtotal = item_subtotal(price, quantity);

        Ok(OrderItem {
            id: OrderItemId::generate(),
            shop_id: shop.id.clone(),
            product_id: product.id.clone(),
            variant_id: variant.id.clone(),
            added_at: Some(input.added_at.unwrap_or(now)),
            created_at: now,
            updated_at: now,
            title: product.title.clone(),
            variant_title: variant.title.clone(),
            product_slug: product.slug.clone(),
            product_type: product.product_type.clone(),
            product_vendor: product.vendor.clone(),
            product_tag_ids: product.tag_ids.clone(),
            attributes: variant.attributes.clone(),
            image_urls: variant.images.clone().or_else(|| product.images.clone()),
            is_taxable,
            tax_code: variant.tax_code.clone().or_else(|| product.tax_code.clone()),
            price,
            quantity,
            subtotal,
            tax: item_tax(subtotal, is_taxable, shop.tax_rate),
        })
    }
}

// =============================================================================
// Free functions
// =============================================================================

fn resolve_currency(shop: &Shop, raw: &str) -> Result<CurrencyCode> {
    let currency_code: CurrencyCode = raw
        .parse()
        .map_err(|e: order_desk_core::MoneyError| AppError::BadRequest(e.to_string()))?;
    if shop.currencies.contains(&currency_code) {
        Ok(currency_code)
    } else {
        Err(AppError::BadRequest(format!(
            "shop {} does not accept {currency_code}",
            shop.id
        )))
    }
}

fn client_money(amount: f64, currency_code: CurrencyCode, field: &str) -> Result<Money> {
    Money::from_f64(amount, currency_code)
        .map_err(|e| AppError::BadRequest(format!("{field}: {e}")))
}

fn id_of(order: &Order) -> &str {
    order.id.as_str()
}

fn authorize_read(viewer: &Viewer, order: Option<Order>, token: Option<&str>) -> Result<Option<Order>> {
    match order {
        Some(order) if viewer.can_read_order(&order, token) => Ok(Some(order)),
        Some(order) => Err(AppError::Forbidden(format!(
            "not allowed to read order {}",
            order.id
        ))),
        None => Ok(None),
    }
}

/// Give every payment a concrete amount.
///
/// At most one payment may omit its amount; it receives what the others
/// leave of `total`. The amounts must then add up to `total` exactly.
fn allocate_payments(
    shop_id: &ShopId,
    total: Money,
    payments: Vec<NewPayment>,
) -> Result<Vec<(PaymentMethodName, AuthorizationRequest)>> {
    let currency_code = total.currency_code;

    if payments.is_empty() {
        if total.amount > Decimal::ZERO {
            return Err(AppError::BadRequest(format!(
                "a payment is required for an order total of {}",
                total.display()
            )));
        }
        return Ok(Vec::new());
    }
    if payments.iter().filter(|p| p.amount.is_none()).count() > 1 {
        return Err(AppError::BadRequest(
            "only one payment may omit its amount".to_owned(),
        ));
    }

    let mut known = Vec::with_capacity(payments.len());
    for payment in &payments {
        let amount = payment
            .amount
            .map(|amount| client_money(amount, currency_code, "amount"))
            .transpose()?;
        if amount.is_some_and(|m| m.amount < Decimal::ZERO) {
            return Err(AppError::BadRequest(
                "payment amount must not be negative".to_owned(),
            ));
        }
        known.push(amount);
    }

    let paid = checked_sum(known.iter().flatten().copied())?;
    let remainder = total
        .amount
        .checked_sub(paid)
        .map(|amount| Money::new(amount, currency_code))
        .ok_or_else(payment_overflow)?;
    if known.iter().any(Option::is_none) && remainder.amount < Decimal::ZERO {
        return Err(AppError::BadRequest(format!(
            "payments exceed the order total of {}",
            total.display()
        )));
    }

    let allocated: Vec<Money> = known
        .into_iter()
        .map(|amount| amount.unwrap_or(remainder))
        .collect();
    let sum = Money::new(checked_sum(allocated.iter().copied())?, currency_code);
    if sum != total {
        return Err(AppError::BadRequest(format!(
            "payment amounts {} do not add up to the order total {}",
            sum.display(),
            total.display()
        )));
    }

    Ok(payments
        .into_iter()
        .zip(allocated)
        .map(|(payment, amount)| {
            (
                payment.method,
                AuthorizationRequest {
                    shop_id: shop_id.clone(),
                    amount,
                    billing_address: payment.billing_address,
                    data: payment.data,
                },
            )
        })
        .collect())
}

/// Add client amounts, rejecting sums `Decimal` cannot hold.
fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Result<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.amount))
        .ok_or_else(payment_overflow)
}

fn payment_overflow() -> AppError {
    AppError::BadRequest("payment amounts are too large".to_owned())
}

fn payment_record(
    authorization: &Authorization,
    billing_address: Option<Address>,
    now: DateTime<Utc>,
) -> Payment {
    Payment {
        id: PaymentId::generate(),
        amount: authorization.amount,
        method: authorization.method,
        display_name: authorization.display_name.clone(),
        processor: authorization.processor.clone(),
        status: PaymentStatus::Created,
        transaction_id: authorization.transaction_id.clone(),
        billing_address,
        created_at: now,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{CartStore, MemoryStore, OrderStore};
    use crate::models::Cart;

    const CATALOG: &str = r#"
shops:
  - { id: shop-1, name: Shop, currencies: [USD], tax_rate: "0.10" }
fulfillment_methods:
  - id: ground
    shop_id: shop-1
    name: ground
    display_name: Ground
    fulfillment_types: [shipping]
    pricing:
      USD: { rate: "5.00", handling: "1.00" }
products:
  - id: shirt
    shop_id: shop-1
    title: Shirt
    variants:
      - { id: shirt-m, title: M, prices: { USD: "20.00" } }
  - id: sticker
    shop_id: shop-1
    title: Sticker
    is_taxable: false
    variants:
      - { id: sticker-1, prices: { USD: "2.50" } }
"#;

    struct Fixture {
        store: MemoryStore,
        catalog: Catalog,
        payments: PaymentMethodRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                catalog: Catalog::from_yaml_str(CATALOG).unwrap(),
                payments: PaymentMethodRegistry::with_defaults(),
            }
        }

        fn service(&self) -> OrderService<'_> {
            OrderService::new(&self.store, &self.catalog, &self.payments)
        }
    }

    fn address() -> Address {
        Address {
            address1: "1 Main St".into(),
            address2: None,
            city: "Springfield".into(),
            company: None,
            country: "US".into(),
            full_name: "Pat Doe".into(),
            phone: "555-0100".into(),
            postal: "12345".into(),
            region: "OR".into(),
        }
    }

    fn item(product: &str, variant: &str, quantity: i32, price: f64) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(product),
            variant_id: VariantId::new(variant),
            quantity,
            price,
            added_at: None,
        }
    }

    fn new_order(items: Vec<NewOrderItem>) -> NewOrder {
        NewOrder {
            shop_id: ShopId::new("shop-1"),
            currency_code: "USD".into(),
            email: "pat@example.com".into(),
            cart_id: None,
            fulfillment_groups: vec![NewFulfillmentGroup {
                shop_id: ShopId::new("shop-1"),
                fulfillment_type: FulfillmentType::Shipping,
                selected_fulfillment_method_id: FulfillmentMethodId::new("ground"),
                shipping_address: Some(address()),
                items,
                total_price: None,
            }],
        }
    }

    fn iou(amount: Option<f64>) -> NewPayment {
        NewPayment {
            method: PaymentMethodName::IouExample,
            amount,
            billing_address: None,
            data: serde_json::json!({ "fullName": "Pat Doe" }),
        }
    }

    fn usd(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    #[tokio::test]
    async fn test_place_order_prices_on_server() {
        let fx = Fixture::new();
        let placed = fx
            .service()
            .place_order(
                &Viewer::account("acct-1"),
                new_order(vec![item("shirt", "shirt-m", 2, 20.0), item("sticker", "sticker-1", 1, 2.5)]),
                vec![iou(None)],
            )
            .await
            .unwrap();

        let order = &placed.order;
        let summary = order.summary();
        // 40.00 + 2.50 items, 6.00 shipping, 4.00 tax on the shirts only
        assert_eq!(summary.item_total, usd(4250));
        assert_eq!(summary.fulfillment_total, usd(600));
        assert_eq!(summary.tax_total, usd(400));
        assert_eq!(summary.total, usd(5250));
        assert_eq!(order.payments.len(), 1);
        assert_eq!(order.payments[0].amount, usd(5250));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.reference_id.len(), 10);
        assert_ne!(order.reference_id, order.id.as_str());
        assert!(placed.token.is_none());
        assert_eq!(fx.store.order_by_id(&order.id).await.unwrap().as_ref(), Some(order));
    }

    #[tokio::test]
    async fn test_anonymous_order_gets_token() {
        let fx = Fixture::new();
        let placed = fx
            .service()
            .place_order(
                &Viewer::anonymous(),
                new_order(vec![item("shirt", "shirt-m", 1, 20.0)]),
                vec![iou(None)],
            )
            .await
            .unwrap();

        let token = placed.token.unwrap();
        assert_eq!(placed.order.anonymous_access_tokens.len(), 1);
        assert_ne!(placed.order.anonymous_access_tokens[0].hashed_token, token);

        let service = fx.service();
        let shop = ShopId::new("shop-1");
        let found = service
            .order_by_id(&Viewer::anonymous(), &placed.order.id, &shop, Some(&token))
            .await
            .unwrap();
        assert!(found.is_some());
        let denied = service
            .order_by_id(&Viewer::anonymous(), &placed.order.id, &shop, None)
            .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_rejects_stale_client_price() {
        let fx = Fixture::new();
        let err = fx
            .service()
            .place_order(
                &Viewer::anonymous(),
                new_order(vec![item("shirt", "shirt-m", 1, 18.0)]),
                vec![iou(None)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[tokio::test]
    async fn test_rejects_wrong_group_total() {
        let fx = Fixture::new();
        let mut input = new_order(vec![item("shirt", "shirt-m", 1, 20.0)]);
        input.fulfillment_groups[0].total_price = Some(20.0);
        let err = fx
            .service()
            .place_order(&Viewer::anonymous(), input, vec![iou(None)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("total"));

        let mut input = new_order(vec![item("shirt", "shirt-m", 1, 20.0)]);
        input.fulfillment_groups[0].total_price = Some(28.0);
        assert!(fx
            .service()
            .place_order(&Viewer::anonymous(), input, vec![iou(None)])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let fx = Fixture::new();
        let service = fx.service();
        let viewer = Viewer::anonymous();

        let zero_quantity = new_order(vec![item("shirt", "shirt-m", 0, 20.0)]);
        assert!(service.place_order(&viewer, zero_quantity, vec![iou(None)]).await.is_err());

        let mut no_address = new_order(vec![item("shirt", "shirt-m", 1, 20.0)]);
        no_address.fulfillment_groups[0].shipping_address = None;
        assert!(service.place_order(&viewer, no_address, vec![iou(None)]).await.is_err());

        let mut bad_email = new_order(vec![item("shirt", "shirt-m", 1, 20.0)]);
        bad_email.email = "not-an-email".into();
        assert!(matches!(
            service.place_order(&viewer, bad_email, vec![iou(None)]).await,
            Err(AppError::Email(_))
        ));

        let mut bad_currency = new_order(vec![item("shirt", "shirt-m", 1, 20.0)]);
        bad_currency.currency_code = "EUR".into();
        assert!(service.place_order(&viewer, bad_currency, vec![iou(None)]).await.is_err());

        let mut no_groups = new_order(Vec::new());
        no_groups.fulfillment_groups.clear();
        assert!(service.place_order(&viewer, no_groups, vec![iou(None)]).await.is_err());

        let too_many = new_order(vec![item("shirt", "shirt-m", i32::MAX, 20.0)]);
        assert!(matches!(
            service.place_order(&viewer, too_many, vec![iou(None)]).await,
            Err(AppError::BadRequest(_))
        ));

        let unknown = new_order(vec![item("shirt", "shirt-xl", 1, 20.0)]);
        assert!(matches!(
            service.place_order(&viewer, unknown, vec![iou(None)]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_allocate_payments_remainder() {
        let shop = ShopId::new("shop-1");
        let requests =
            allocate_payments(&shop, usd(5000), vec![iou(Some(12.5)), iou(None)]).unwrap();
        let amounts: Vec<Money> = requests.iter().map(|(_, r)| r.amount).collect();
        assert_eq!(amounts, [usd(1250), usd(3750)]);
    }

    #[test]
    fn test_allocate_payments_rejections() {
        let shop = ShopId::new("shop-1");
        assert!(allocate_payments(&shop, usd(5000), vec![iou(None), iou(None)]).is_err());
        assert!(allocate_payments(&shop, usd(5000), vec![iou(Some(10.0))]).is_err());
        assert!(allocate_payments(&shop, usd(5000), vec![iou(Some(60.0)), iou(None)]).is_err());
        assert!(allocate_payments(&shop, usd(5000), vec![iou(Some(-1.0)), iou(None)]).is_err());
        assert!(allocate_payments(&shop, usd(5000), Vec::new()).is_err());
        assert!(allocate_payments(&shop, usd(0), Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_allocate_payments_rejects_overflowing_amounts() {
        let shop = ShopId::new("shop-1");
        let err = allocate_payments(&shop, usd(5000), vec![iou(Some(7e28)), iou(Some(7e28))])
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let payments = vec![iou(Some(7e28)), iou(Some(7e28)), iou(None)];
        let err = allocate_payments(&shop, usd(5000), payments).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = allocate_payments(&shop, usd(5000), vec![iou(Some(1e30))]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_declined_payment_leaves_no_order() {
        let fx = Fixture::new();
        let mut declined = iou(None);
        declined.data = serde_json::json!({});
        let err = fx
            .service()
            .place_order(
                &Viewer::account("acct-1"),
                new_order(vec![item("shirt", "shirt-m", 1, 20.0)]),
                vec![iou(Some(10.0)), declined],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Payment(_)));

        let orders = fx
            .store
            .orders_by_account_id(&AccountId::new("acct-1"), &OrderFilter::default())
            .await
            .unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_cart_is_deleted() {
        let fx = Fixture::new();
        let cart = Cart {
            id: CartId::new("cart-1"),
            shop_id: ShopId::new("shop-1"),
            account_id: Some(AccountId::new("acct-1")),
            created_at: Utc::now(),
        };
        fx.store.insert_cart(&cart).await.unwrap();

        let mut input = new_order(vec![item("shirt", "shirt-m", 1, 20.0)]);
        input.cart_id = Some(cart.id.clone());

        let err = fx
            .service()
            .place_order(&Viewer::account("acct-2"), input.clone(), vec![iou(None)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let placed = fx
            .service()
            .place_order(&Viewer::account("acct-1"), input, vec![iou(None)])
            .await
            .unwrap();
        assert_eq!(placed.order.cart_id, Some(cart.id.clone()));
        assert_eq!(fx.store.cart_by_id(&cart.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_order_follows_workflow() {
        let fx = Fixture::new();
        let service = fx.service();
        let placed = service
            .place_order(
                &Viewer::account("acct-1"),
                new_order(vec![item("shirt", "shirt-m", 1, 20.0)]),
                vec![iou(None)],
            )
            .await
            .unwrap();
        let id = placed.order.id;
        let admin = Viewer::shop_admin("staff", [ShopId::new("shop-1")]);

        let forbidden = service
            .update_order(&Viewer::account("acct-1"), &id, OrderChanges {
                status: Some("coreOrderWorkflow/canceled".into()),
                email: None,
            })
            .await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

        let skipped = service
            .update_order(&admin, &id, OrderChanges {
                status: Some("coreOrderWorkflow/completed".into()),
                email: None,
            })
            .await;
        assert!(matches!(skipped, Err(AppError::BadRequest(_))));

        let processing = service
            .update_order(&admin, &id, OrderChanges {
                status: Some("coreOrderWorkflow/processing".into()),
                email: Some("new@example.com".into()),
            })
            .await
            .unwrap();
        assert_eq!(processing.status, OrderStatus::Processing);
        assert_eq!(processing.email.unwrap().as_str(), "new@example.com");
        assert!(processing.updated_at > placed.order.updated_at);
    }

    #[tokio::test]
    async fn test_update_fulfillment_group_tracking() {
        let fx = Fixture::new();
        let service = fx.service();
        let placed = service
            .place_order(
                &Viewer::account("acct-1"),
                new_order(vec![item("shirt", "shirt-m", 1, 20.0)]),
                vec![iou(None)],
            )
            .await
            .unwrap();
        let admin = Viewer::shop_admin("staff", [ShopId::new("shop-1")]);
        let group_id = placed.order.fulfillment_groups[0].id.clone();

        let updated = service
            .update_fulfillment_group(&admin, &placed.order.id, &group_id, Some(" 1Z999 ".into()))
            .await
            .unwrap();
        assert_eq!(updated.fulfillment_groups[0].tracking.as_deref(), Some("1Z999"));

        let missing = service
            .update_fulfillment_group(
                &admin,
                &placed.order.id,
                &FulfillmentGroupId::new("nope"),
                None,
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_orders_by_account_defaults_newest_first() {
        let fx = Fixture::new();
        let service = fx.service();
        let viewer = Viewer::account("acct-1");
        let mut ids = Vec::new();
        for _ in 0..3 {
            let placed = service
                .place_order(
                    &viewer,
                    new_order(vec![item("shirt", "shirt-m", 1, 20.0)]),
                    vec![iou(None)],
                )
                .await
                .unwrap();
            ids.push(placed.order.id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let page = service
            .orders_by_account_id(
                &viewer,
                &AccountId::new("acct-1"),
                &OrderFilter::default(),
                OrderSortField::default(),
                SortOrder::Desc,
                &PageRequest::default(),
            )
            .await
            .unwrap();
        let listed: Vec<&OrderId> = page.nodes().map(|order| &order.id).collect();
        ids.reverse();
        assert_eq!(listed, ids.iter().collect::<Vec<_>>());
        assert_eq!(page.total_count, 3);

        let other = service
            .orders_by_account_id(
                &Viewer::account("acct-2"),
                &AccountId::new("acct-1"),
                &OrderFilter::default(),
                OrderSortField::default(),
                SortOrder::Desc,
                &PageRequest::default(),
            )
            .await;
        assert!(matches!(other, Err(AppError::Forbidden(_))));
    }
}
