//! Integration tests for Order Desk.
//!
//! Tests execute GraphQL documents against the real schema, backed by the
//! in-memory store and the development catalog fixture, so no database or
//! running server is needed.
//!
//! ```bash
//! cargo test -p order-desk-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use async_graphql::{Request, Variables};
use serde_json::{Value, json};

use order_desk_api::config::ApiConfig;
use order_desk_api::db::MemoryStore;
use order_desk_api::graphql::{OrderDeskSchema, build_schema};
use order_desk_api::services::access::Viewer;
use order_desk_api::services::{Catalog, PaymentMethodRegistry};
use order_desk_api::state::AppState;

/// The development catalog shipped with the API crate.
pub const CATALOG_YAML: &str = include_str!("../../api/fixtures/catalog.yaml");

/// A schema over a fresh in-memory store.
pub struct TestContext {
    pub schema: OrderDeskSchema,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    /// Context with the built-in payment processors.
    #[must_use]
    pub fn new() -> Self {
        Self::with_payments(PaymentMethodRegistry::with_defaults())
    }

    /// Context with custom payment processors.
    ///
    /// # Panics
    ///
    /// Panics if the fixture catalog is invalid.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_payments(payments: PaymentMethodRegistry) -> Self {
        let config = ApiConfig::from_lookup(|_| None).expect("default config is valid");
        let catalog = Catalog::from_yaml_str(CATALOG_YAML).expect("fixture catalog is valid");
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone(), catalog, payments);
        Self {
            schema: build_schema(state),
            store,
        }
    }

    /// Execute `query` as `viewer` and return the JSON response, errors included.
    ///
    /// # Panics
    ///
    /// Panics if the response cannot be serialized.
    #[allow(clippy::expect_used)]
    pub async fn execute(&self, query: &str, variables: Value, viewer: Viewer) -> Value {
        let request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(viewer);
        let response = self.schema.execute(request).await;
        serde_json::to_value(&response).expect("response serializes")
    }

    /// Place `order` with `payments` and return the `placeOrder` payload.
    pub async fn place_order(&self, viewer: Viewer, order: Value, payments: Value) -> Value {
        self.execute(
            PLACE_ORDER,
            json!({ "input": { "clientMutationId": "cm-1", "order": order, "payments": payments } }),
            viewer,
        )
        .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `extensions.code` of the first error in a response.
#[must_use]
pub fn error_code(response: &Value) -> Option<&str> {
    response["errors"][0]["extensions"]["code"].as_str()
}

/// A shipping address.
#[must_use]
pub fn address() -> Value {
    json!({
        "address1": "1 Pineapple Way",
        "city": "Honolulu",
        "country": "US",
        "fullName": "Kai Nalu",
        "phone": "808-555-0100",
        "postal": "96813",
        "region": "HI"
    })
}

/// Two medium tees and one 8 oz bag, shipped by ground from `shop-main`.
///
/// Server totals: items 56.99, shipping 5.50, tax 3.84, total 66.33.
#[must_use]
pub fn standard_order() -> Value {
    json!({
        "shopId": "shop-main",
        "currencyCode": "USD",
        "email": "kai@example.com",
        "fulfillmentGroups": [{
            "shopId": "shop-main",
            "type": "shipping",
            "selectedFulfillmentMethodId": "ground",
            "totalPrice": 66.33,
            "data": { "shippingAddress": address() },
            "items": [
                {
                    "productConfiguration": { "productId": "prod-tee", "productVariantId": "var-tee-m" },
                    "price": 24.0,
                    "quantity": 2,
                    "addedAt": "2026-10-01T10:00:00Z"
                },
                {
                    "productConfiguration": { "productId": "prod-dried-pineapple", "productVariantId": "var-dried-8oz" },
                    "price": 8.99,
                    "quantity": 1,
                    "addedAt": "2026-10-01T09:00:00Z"
                }
            ]
        }]
    })
}

/// An IOU payment, for `amount` or the remainder when `None`.
#[must_use]
pub fn iou(amount: Option<f64>) -> Value {
    json!({
        "method": "iou_example",
        "amount": amount,
        "data": { "fullName": "Kai Nalu" }
    })
}

/// `placeOrder` selecting most of the order graph.
pub const PLACE_ORDER: &str = r#"
mutation PlaceOrder($input: PlaceOrderInput!) {
  placeOrder(input: $input) {
    clientMutationId
    token
    orders {
      _id
      referenceId
      email
      account { _id }
      shop { _id }
      status { status label }
      displayStatus(language: "es")
      totalItemQuantity
      summary {
        itemTotal { amount }
        fulfillmentTotal { amount }
        taxTotal { amount }
        taxableAmount { amount }
        effectiveTaxRate
        total { amount displayAmount currency { code } }
      }
      payments {
        amount { amount }
        displayName
        processor
        status
        method { name }
      }
      fulfillmentGroups {
        _id
        type
        tracking
        data { ... on ShippingOrderFulfillmentGroupData { shippingAddress { fullName } } }
        selectedFulfillmentOption {
          fulfillmentMethod { name carrier }
          price { amount }
          handlingPrice { amount }
        }
        items {
          totalCount
          nodes {
            title
            quantity
            price { amount }
            subtotal { amount }
            tax { amount }
            productConfiguration { productId productVariantId }
            productTags { nodes { name } }
          }
        }
      }
    }
  }
}
"#;
