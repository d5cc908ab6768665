//! Mutation root.

use async_graphql::{Context, Object};

use super::inputs::{
    PlaceOrderInput, PlaceOrderPayload, UpdateOrderFulfillmentGroupInput,
    UpdateOrderFulfillmentGroupPayload, UpdateOrderInput, UpdateOrderPayload,
};
use super::types::Order;
use super::{IntoGraphqlResult, app_state, viewer};
use crate::services::orders::NewPayment;

/// Order placement and administration.
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Place an order.
    ///
    /// The order is created only if every payment authorizes. Prices and
    /// totals are recomputed on the server and the input is rejected when
    /// the client's figures disagree.
    async fn place_order(
        &self,
        ctx: &Context<'_>,
        input: PlaceOrderInput,
    ) -> async_graphql::Result<PlaceOrderPayload> {
        let state = app_state(ctx)?;
        let payments = input
            .payments
            .unwrap_or_default()
            .into_iter()
            .map(NewPayment::from)
            .collect();
        let placed = state
            .orders()
            .place_order(&viewer(ctx), input.order.into(), payments)
            .await
            .into_gql()?;

        Ok(PlaceOrderPayload {
            client_mutation_id: input.client_mutation_id,
            orders: vec![Order::from(placed.order)],
            token: placed.token,
        })
    }

    /// Change the status or email of an order. Shop administrators only.
    async fn update_order(
        &self,
        ctx: &Context<'_>,
        input: UpdateOrderInput,
    ) -> async_graphql::Result<UpdateOrderPayload> {
        let state = app_state(ctx)?;
        let (client_mutation_id, order_id, changes) = input.into_parts();
        let order = state
            .orders()
            .update_order(&viewer(ctx), &order_id, changes)
            .await
            .into_gql()?;

        Ok(UpdateOrderPayload {
            client_mutation_id,
            order: order.into(),
        })
    }

    /// Set the tracking reference of a fulfillment group. Shop
    /// administrators only.
    async fn update_order_fulfillment_group(
        &self,
        ctx: &Context<'_>,
        input: UpdateOrderFulfillmentGroupInput,
    ) -> async_graphql::Result<UpdateOrderFulfillmentGroupPayload> {
        let state = app_state(ctx)?;
        let (order_id, group_id) = input.ids();
        let order = state
            .orders()
            .update_fulfillment_group(&viewer(ctx), &order_id, &group_id, input.tracking)
            .await
            .into_gql()?;

        Ok(UpdateOrderFulfillmentGroupPayload {
            client_mutation_id: input.client_mutation_id,
            order: order.into(),
        })
    }
}
