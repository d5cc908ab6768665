//! Caller identity and order read access.
//!
//! Authentication happens upstream. The gateway forwards the signed-in
//! account as `x-account-id` and the shops the caller administers as a
//! comma-separated `x-admin-shop-ids`.

use std::collections::BTreeSet;

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use order_desk_core::{AccountId, ShopId};

use crate::error::AppError;
use crate::models::Order;

/// Header carrying the signed-in account.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Header carrying the shops the caller may administer.
pub const ADMIN_SHOP_IDS_HEADER: &str = "x-admin-shop-ids";

/// The caller of a GraphQL request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub account_id: Option<AccountId>,
    pub admin_shop_ids: BTreeSet<ShopId>,
}

impl Viewer {
    /// A caller that is not signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in shopper.
    #[must_use]
    pub fn account(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            admin_shop_ids: BTreeSet::new(),
        }
    }

    /// A signed-in operator of the given shops.
    #[must_use]
    pub fn shop_admin(
        account_id: impl Into<AccountId>,
        shop_ids: impl IntoIterator<Item = ShopId>,
    ) -> Self {
        Self {
            account_id: Some(account_id.into()),
            admin_shop_ids: shop_ids.into_iter().collect(),
        }
    }

    /// Build the viewer from gateway headers. Malformed or blank values are
    /// treated as absent.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let account_id = header(ACCOUNT_ID_HEADER).map(AccountId::new);
        let admin_shop_ids = header(ADMIN_SHOP_IDS_HEADER)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(ShopId::new)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            account_id,
            admin_shop_ids,
        }
    }

    #[must_use]
    pub fn is_shop_admin(&self, shop_id: &ShopId) -> bool {
        self.admin_shop_ids.contains(shop_id)
    }

    /// Whether the viewer is the signed-in owner of `account_id`.
    #[must_use]
    pub fn is_account(&self, account_id: &AccountId) -> bool {
        self.account_id.as_ref() == Some(account_id)
    }

    /// Whether the viewer may read `order`, optionally presenting an
    /// anonymous access token.
    #[must_use]
    pub fn can_read_order(&self, order: &Order, token: Option<&str>) -> bool {
        if self.is_shop_admin(&order.shop_id) {
            return true;
        }
        if order
            .account_id
            .as_ref()
            .is_some_and(|owner| self.is_account(owner))
        {
            return true;
        }
        token.is_some_and(|token| {
            let hashed = hash_token(token);
            order
                .anonymous_access_tokens
                .iter()
                .any(|stored| stored.hashed_token == hashed)
        })
    }

    /// Require the viewer to administer `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` otherwise.
    pub fn require_shop_admin(&self, shop_id: &ShopId) -> Result<(), AppError> {
        if self.is_shop_admin(shop_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "not an administrator of shop {shop_id}"
            )))
        }
    }

    /// Require the viewer to be `account_id` or an admin of every shop in
    /// `shop_ids`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` otherwise.
    pub fn require_account_access(
        &self,
        account_id: &AccountId,
        shop_ids: &[ShopId],
    ) -> Result<(), AppError> {
        if self.is_account(account_id) {
            return Ok(());
        }
        if !shop_ids.is_empty() && shop_ids.iter().all(|id| self.is_shop_admin(id)) {
            return Ok(());
        }
        Err(AppError::Forbidden(format!(
            "not allowed to list orders of account {account_id}"
        )))
    }
}

/// SHA-256 of an access token, base64 encoded. Only this hash is stored.
#[must_use]
pub fn hash_token(token: &str) -> String {
    STANDARD.encode(Sha256::digest(token.as_bytes()))
}
