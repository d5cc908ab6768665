//! Application state shared across handlers and resolvers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::catalog::Catalog;
use crate::services::orders::OrderService;
use crate::services::payments::PaymentMethodRegistry;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the order store and catalog snapshot.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    catalog: Catalog,
    payments: PaymentMethodRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `store` - Order and cart storage backend
    /// * `catalog` - Catalog snapshot used for pricing
    /// * `payments` - Payment processors by method
    #[must_use]
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn Store>,
        catalog: Catalog,
        payments: PaymentMethodRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                catalog,
                payments,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the payment processors.
    #[must_use]
    pub fn payments(&self) -> &PaymentMethodRegistry {
        &self.inner.payments
    }

    /// Order operations bound to this state.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.catalog(), self.payments())
    }
}
