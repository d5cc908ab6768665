//! Unified error handling with Sentry integration.
//!
//! Resolvers and services return `Result<T, AppError>`. At the GraphQL
//! boundary an `AppError` becomes a GraphQL error carrying
//! `extensions.code`; server errors are captured to Sentry first and their
//! details are not sent to the client.

use async_graphql::ErrorExtensions;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use order_desk_core::EmailError;
use order_desk_core::pagination::PaginationError;

use crate::db::RepositoryError;
use crate::services::payments::PaymentError;

/// Application-level error type for the order API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payment authorization failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Email address failed validation.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Pagination arguments were rejected.
    #[error("Invalid pagination: {0}")]
    Pagination(#[from] PaginationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Value of `extensions.code` in GraphQL responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) | Self::Internal(_) | Self::Payment(PaymentError::Processor(_)) => {
                "INTERNAL_SERVER_ERROR"
            }
            Self::Payment(PaymentError::Declined(_)) => "PAYMENT_DECLINED",
            Self::Payment(_) | Self::Email(_) | Self::Pagination(_) | Self::BadRequest(_) => {
                "BAD_USER_INPUT"
            }
            Self::Forbidden(_) => "FORBIDDEN",
        }
    }

    /// Whether the failure is ours rather than the caller's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(RepositoryError::NotFound) => false,
            Self::Database(_) | Self::Internal(_) | Self::Payment(PaymentError::Processor(_)) => {
                true
            }
            _ => false,
        }
    }

    /// Message safe to show to the client.
    fn client_message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Payment(PaymentError::Declined(reason)) => {
                format!("Payment declined: {reason}")
            }
            Self::Payment(err) => err.to_string(),
            Self::Email(err) => format!("Invalid email: {err}"),
            Self::Pagination(err) => err.to_string(),
            Self::Database(_) => "Not found".to_owned(),
            Self::NotFound(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".to_owned(),
        }
    }

    /// Log the error, and capture it to Sentry when it is a server error.
    fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        self.report();
        let code = self.code();
        async_graphql::Error::new(self.client_message()).extend_with(|_, e| e.set("code", code))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();

        let status = match self.code() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "BAD_USER_INPUT" => StatusCode::BAD_REQUEST,
            "PAYMENT_DECLINED" => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.client_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for an order action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_owned(),
            serde_json::Value::String((*value).to_owned()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
