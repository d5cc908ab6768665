//! Server-side order pricing.
//!
//! Prices sent by clients are never trusted; they are only compared against
//! the amounts computed here.

use rust_decimal::Decimal;

use order_desk_core::{CurrencyCode, Money};

use crate::models::{OrderItem, OrderSummary, effective_rate};

/// `price * quantity`, rounded to the currency precision.
#[must_use]
pub fn item_subtotal(price: Money, quantity: u32) -> Money {
    Money::new(price.amount * Decimal::from(quantity), price.currency_code)
}

/// Tax owed on one line.
#[must_use]
pub fn item_tax(subtotal: Money, is_taxable: bool, tax_rate: Decimal) -> Money {
    if is_taxable {
        Money::new(subtotal.amount * tax_rate, subtotal.currency_code)
    } else {
        Money::zero(subtotal.currency_code)
    }
}

/// Totals of one fulfillment group.
///
/// `tax_total` is the sum of the per-line taxes so that line and group
/// amounts always agree.
#[must_use]
pub fn summarize_group(
    currency_code: CurrencyCode,
    items: &[OrderItem],
    rate: Money,
    handling: Money,
) -> OrderSummary {
    let sum = |f: &dyn Fn(&OrderItem) -> Decimal| -> Decimal { items.iter().map(f).sum() };

    let item_total = sum(&|item| item.subtotal.amount);
    let taxable_amount = sum(&|item| {
        if item.is_taxable {
            item.subtotal.amount
        } else {
            Decimal::ZERO
        }
    });
    let tax_total = sum(&|item| item.tax.amount);
    let fulfillment_total = rate.amount + handling.amount;
    let discount_total = Decimal::ZERO;
    let total = (item_total + fulfillment_total + tax_total - discount_total).max(Decimal::ZERO);

    OrderSummary {
        discount_total: Money::new(discount_total, currency_code),
        effective_tax_rate: effective_rate(tax_total, taxable_amount),
        fulfillment_total: Money::new(fulfillment_total, currency_code),
        item_total: Money::new(item_total, currency_code),
        tax_total: Money::new(tax_total, currency_code),
        taxable_amount: Money::new(taxable_amount, currency_code),
        total: Money::new(total, currency_code),
    }
}

/// Whether a client-supplied amount matches the server amount once both are
/// rounded to the currency precision.
#[must_use]
pub fn amounts_match(client: Money, server: Money) -> bool {
    client.currency_code == server.currency_code
        && client.currency_code.round(client.amount) == server.currency_code.round(server.amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use order_desk_core::{OrderItemId, ProductId, ShopId, VariantId};

    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    fn line(price_cents: i64, quantity: u32, is_taxable: bool, rate: Decimal) -> OrderItem {
        let price = usd(price_cents);
        let subtotal = item_subtotal(price, quantity);
        let now = Utc::now();
        OrderItem {
            id: OrderItemId::generate(),
            shop_id: ShopId::new("shop"),
            product_id: ProductId::new("p"),
            variant_id: VariantId::new("v"),
            added_at: None,
            created_at: now,
            updated_at: now,
            title: "Item".into(),
            variant_title: None,
            product_slug: None,
            product_type: None,
            product_vendor: None,
            product_tag_ids: Vec::new(),
            attributes: Vec::new(),
            image_urls: None,
            is_taxable,
            tax_code: None,
            price,
            quantity,
            subtotal,
            tax: item_tax(subtotal, is_taxable, rate),
        }
    }

    #[test]
    fn test_item_subtotal() {
        assert_eq!(item_subtotal(usd(899), 3), usd(2697));
    }

    #[test]
    fn test_item_tax_rounds_half_up() {
        // 8.99 * 0.0825 = 0.741675 -> 0.74
        let tax = item_tax(usd(899), true, Decimal::new(825, 4));
        assert_eq!(tax, usd(74));
        assert_eq!(item_tax(usd(899), false, Decimal::new(825, 4)), usd(0));
    }

    #[test]
    fn test_summarize_group() {
        let rate = Decimal::new(8, 2);
        let items = vec![line(2400, 2, true, rate), line(899, 1, false, rate)];
        let summary = summarize_group(CurrencyCode::USD, &items, usd(500), usd(50));

        assert_eq!(summary.item_total, usd(5699));
        assert_eq!(summary.taxable_amount, usd(4800));
        assert_eq!(summary.tax_total, usd(384));
        assert_eq!(summary.fulfillment_total, usd(550));
        assert_eq!(summary.discount_total, usd(0));
        assert_eq!(summary.total, usd(5699 + 550 + 384));
        assert_eq!(summary.effective_tax_rate, Decimal::new(8, 2));
    }

    #[test]
    fn test_amounts_match_ignores_float_noise() {
        let client = Money::from_f64(0.1 + 0.2, CurrencyCode::USD).unwrap();
        assert!(amounts_match(client, usd(30)));
        assert!(!amounts_match(usd(31), usd(30)));
        assert!(!amounts_match(
            Money::new(Decimal::new(30, 2), CurrencyCode::EUR),
            usd(30)
        ));
    }
}
