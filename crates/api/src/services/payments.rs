//! Payment authorization.
//!
//! Each [`PaymentMethodName`] is served by a [`PaymentProcessor`]. Order
//! placement authorizes every submitted payment before an order is written
//! and voids the ones already authorized if a later one is declined.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use order_desk_core::{Money, ShopId};

use crate::models::{Address, PaymentMethodName};

/// Errors that can occur when talking to a payment processor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The processor refused the authorization.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The payment data sent by the client is unusable.
    #[error("invalid payment data: {0}")]
    InvalidData(String),

    /// No processor is registered for the method.
    #[error("payment method {} is not available", .0.as_str())]
    UnsupportedMethod(PaymentMethodName),

    /// The processor failed for reasons unrelated to the buyer.
    #[error("payment processor error: {0}")]
    Processor(String),
}

/// What a processor is asked to authorize.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub shop_id: ShopId,
    pub amount: Money,
    pub billing_address: Option<Address>,
    pub data: serde_json::Value,
}

/// A successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub method: PaymentMethodName,
    pub processor: String,
    pub display_name: String,
    pub transaction_id: Option<String>,
    pub amount: Money,
}

/// A payment backend.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// The method this processor serves.
    fn method(&self) -> PaymentMethodName;

    /// Reserve funds.
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, PaymentError>;

    /// Release a previous authorization.
    async fn void(&self, authorization: &Authorization) -> Result<(), PaymentError>;
}

/// Processors keyed by payment method.
#[derive(Clone, Default)]
pub struct PaymentMethodRegistry {
    processors: HashMap<PaymentMethodName, Arc<dyn PaymentProcessor>>,
}

impl std::fmt::Debug for PaymentMethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentMethodRegistry")
            .field("methods", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PaymentMethodRegistry {
    /// Registry with the built-in `none` and `iou_example` processors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(NoPaymentProcessor));
        registry.register(Arc::new(IouExampleProcessor));
        registry
    }

    /// Add or replace the processor for its method.
    pub fn register(&mut self, processor: Arc<dyn PaymentProcessor>) {
        self.processors.insert(processor.method(), processor);
    }

    /// Processor serving `method`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::UnsupportedMethod` when none is registered.
    pub fn get(&self, method: PaymentMethodName) -> Result<&Arc<dyn PaymentProcessor>, PaymentError> {
        self.processors
            .get(&method)
            .ok_or(PaymentError::UnsupportedMethod(method))
    }

    /// Authorize payments in order; on the first failure, void the ones
    /// already authorized (most recent first) and return the failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first payment that could not be authorized.
    pub async fn authorize_all(
        &self,
        requests: Vec<(PaymentMethodName, AuthorizationRequest)>,
    ) -> Result<Vec<Authorization>, PaymentError> {
        let mut authorized = Vec::with_capacity(requests.len());
        for (method, request) in requests {
            let result = match self.get(method) {
                Ok(processor) => processor.authorize(&request).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(authorization) => {
                    tracing::debug!(
                        method = method.as_str(),
                        amount = %authorization.amount.amount,
                        "Payment authorized"
                    );
                    authorized.push(authorization);
                }
                Err(err) => {
                    tracing::warn!(method = method.as_str(), error = %err, "Payment authorization failed");
                    self.void_all(&authorized).await;
                    return Err(err);
                }
            }
        }
        Ok(authorized)
    }

    /// Void authorizations, most recent first. Failures are logged.
    pub async fn void_all(&self, authorizations: &[Authorization]) {
        for authorization in authorizations.iter().rev() {
            let result = match self.get(authorization.method) {
                Ok(processor) => processor.void(authorization).await,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                tracing::error!(
                    method = authorization.method.as_str(),
                    transaction_id = ?authorization.transaction_id,
                    error = %err,
                    "Failed to void payment authorization"
                );
            }
        }
    }
}

/// Placeholder method for orders that cost nothing.
#[derive(Debug, Clone, Copy)]
pub struct NoPaymentProcessor;

#[async_trait]
impl PaymentProcessor for NoPaymentProcessor {
    fn method(&self) -> PaymentMethodName {
        PaymentMethodName::None
    }

    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, PaymentError> {
        if !request.amount.is_zero() {
            return Err(PaymentError::InvalidData(
                "payment method none can only be used for a zero amount".to_owned(),
            ));
        }
        Ok(Authorization {
            method: PaymentMethodName::None,
            processor: "None".to_owned(),
            display_name: "No payment".to_owned(),
            transaction_id: None,
            amount: request.amount,
        })
    }

    async fn void(&self, _authorization: &Authorization) -> Result<(), PaymentError> {
        Ok(())
    }
}

/// Example method that authorizes any amount against a buyer's IOU.
///
/// Expects `data.fullName` to be a non-empty string.
#[derive(Debug, Clone, Copy)]
pub struct IouExampleProcessor;

#[async_trait]
impl PaymentProcessor for IouExampleProcessor {
    fn method(&self) -> PaymentMethodName {
        PaymentMethodName::IouExample
    }

    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, PaymentError> {
        let full_name = request
            .data
            .get("fullName")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PaymentError::InvalidData("fullName is required".to_owned()))?;

        Ok(Authorization {
            method: PaymentMethodName::IouExample,
            processor: "Example".to_owned(),
            display_name: format!("IOU from {full_name}"),
            transaction_id: Some(uuid::Uuid::new_v4().simple().to_string()),
            amount: request.amount,
        })
    }

    async fn void(&self, _authorization: &Authorization) -> Result<(), PaymentError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use order_desk_core::CurrencyCode;

    use super::*;

    fn request(cents: i64, data: serde_json::Value) -> AuthorizationRequest {
        AuthorizationRequest {
            shop_id: ShopId::new("shop"),
            amount: Money::new(Decimal::new(cents, 2), CurrencyCode::USD),
            billing_address: None,
            data,
        }
    }

    /// Approves IOUs until `limit` cents, recording voids.
    struct LimitedIou {
        limit: i64,
        voided: Mutex<Vec<Money>>,
    }

    #[async_trait]
    impl PaymentProcessor for LimitedIou {
        fn method(&self) -> PaymentMethodName {
            PaymentMethodName::IouExample
        }

        async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization, PaymentError> {
            if request.amount.amount > Decimal::new(self.limit, 2) {
                return Err(PaymentError::Declined("over limit".into()));
            }
            IouExampleProcessor.authorize(request).await
        }

        async fn void(&self, authorization: &Authorization) -> Result<(), PaymentError> {
            self.voided.lock().unwrap().push(authorization.amount);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_iou_requires_full_name() {
        let err = IouExampleProcessor
            .authorize(&request(100, serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidData(_)));

        let ok = IouExampleProcessor
            .authorize(&request(100, serde_json::json!({ "fullName": "Pat" })))
            .await
            .unwrap();
        assert_eq!(ok.display_name, "IOU from Pat");
        assert!(ok.transaction_id.is_some());
    }

    #[tokio::test]
    async fn test_none_only_for_zero() {
        assert!(NoPaymentProcessor
            .authorize(&request(0, serde_json::Value::Null))
            .await
            .is_ok());
        assert!(NoPaymentProcessor
            .authorize(&request(1, serde_json::Value::Null))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_authorize_all_voids_on_decline() {
        let processor = Arc::new(LimitedIou {
            limit: 1000,
            voided: Mutex::new(Vec::new()),
        });
        let mut registry = PaymentMethodRegistry::default();
        registry.register(processor.clone());

        let data = serde_json::json!({ "fullName": "Pat" });
        let result = registry
            .authorize_all(vec![
                (PaymentMethodName::IouExample, request(500, data.clone())),
                (PaymentMethodName::IouExample, request(700, data.clone())),
                (PaymentMethodName::IouExample, request(5000, data)),
            ])
            .await;

        assert_eq!(result, Err(PaymentError::Declined("over limit".into())));
        let voided = processor.voided.lock().unwrap();
        let cents: Vec<Decimal> = voided.iter().map(|m| m.amount).collect();
        assert_eq!(cents, [Decimal::new(700, 2), Decimal::new(500, 2)]);
    }

    #[tokio::test]
    async fn test_unregistered_method() {
        let registry = PaymentMethodRegistry::default();
        let result = registry
            .authorize_all(vec![(
                PaymentMethodName::None,
                request(0, serde_json::Value::Null),
            )])
            .await;
        assert_eq!(
            result,
            Err(PaymentError::UnsupportedMethod(PaymentMethodName::None))
        );
    }
}
