//! Query root.

use async_graphql::{Context, ID, Object};

use order_desk_core::{AccountId, OrderId, OrderStatus, ShopId};

use super::types::common::page_request;
use super::types::{Order, OrdersByAccountIdConnection, OrdersByAccountIdSortByField, SortOrder};
use super::{IntoGraphqlResult, app_state, viewer};
use crate::db::OrderFilter;
use crate::error::AppError;

/// Order lookups.
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get an order by its internal ID.
    ///
    /// Anonymous buyers pass the `token` returned by `placeOrder`. Returns
    /// null when the shop has no such order.
    async fn order_by_id(
        &self,
        ctx: &Context<'_>,
        id: ID,
        shop_id: ID,
        token: Option<String>,
    ) -> async_graphql::Result<Option<Order>> {
        let state = app_state(ctx)?;
        let order = state
            .orders()
            .order_by_id(
                &viewer(ctx),
                &OrderId::new(id.0),
                &ShopId::new(shop_id.0),
                token.as_deref(),
            )
            .await
            .into_gql()?;
        Ok(order.map(Order::from))
    }

    /// Get an order by its customer-facing reference ID.
    async fn order_by_reference_id(
        &self,
        ctx: &Context<'_>,
        id: ID,
        shop_id: ID,
        token: Option<String>,
    ) -> async_graphql::Result<Option<Order>> {
        let state = app_state(ctx)?;
        let order = state
            .orders()
            .order_by_reference_id(&viewer(ctx), &id, &ShopId::new(shop_id.0), token.as_deref())
            .await
            .into_gql()?;
        Ok(order.map(Order::from))
    }

    /// Orders placed by an account, newest first unless asked otherwise.
    #[allow(clippy::too_many_arguments)]
    async fn orders_by_account_id(
        &self,
        ctx: &Context<'_>,
        account_id: ID,
        #[graphql(desc = "Only orders in these statuses")] order_status: Option<Vec<String>>,
        #[graphql(desc = "Only orders from these shops")] shop_ids: Option<Vec<ID>>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        offset: Option<i32>,
        #[graphql(default_with = "SortOrder::Desc")] sort_order: SortOrder,
        #[graphql(default_with = "OrdersByAccountIdSortByField::CreatedAt")]
        sort_by: OrdersByAccountIdSortByField,
    ) -> async_graphql::Result<OrdersByAccountIdConnection> {
        let state = app_state(ctx)?;
        let statuses = order_status
            .unwrap_or_default()
            .iter()
            .map(|raw| raw.parse::<OrderStatus>().map_err(AppError::BadRequest))
            .collect::<Result<Vec<_>, _>>()
            .into_gql()?;
        let filter = OrderFilter {
            statuses,
            shop_ids: shop_ids
                .unwrap_or_default()
                .into_iter()
                .map(|id| ShopId::new(id.0))
                .collect(),
        };

        let page = state
            .orders()
            .orders_by_account_id(
                &viewer(ctx),
                &AccountId::new(account_id.0),
                &filter,
                sort_by.into(),
                sort_order.into(),
                &page_request(after, before, first, last, offset),
            )
            .await
            .into_gql()?;
        Ok(OrdersByAccountIdConnection::from_page(page))
    }
}
