//! GraphQL schema for the order API.
//!
//! Resolvers stay thin: they convert arguments, call
//! [`crate::services::orders::OrderService`] through [`AppState`], and wrap
//! the results in the output types of [`types`].
//!
//! The schema carries the [`AppState`] as context data; the per-request
//! [`Viewer`] is attached by the `/graphql` handler.

pub mod inputs;
pub mod mutation;
pub mod query;
pub mod types;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema};

use crate::error::AppError;
use crate::services::access::Viewer;
use crate::state::AppState;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

/// The complete order API schema.
pub type OrderDeskSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema around the shared application state.
#[must_use]
pub fn build_schema(state: AppState) -> OrderDeskSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

/// The schema in SDL form.
#[must_use]
pub fn sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

/// Shared state registered with the schema.
pub(crate) fn app_state<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a AppState> {
    ctx.data::<AppState>()
}

/// The caller, anonymous when the request carried no identity.
pub(crate) fn viewer(ctx: &Context<'_>) -> Viewer {
    ctx.data_opt::<Viewer>().cloned().unwrap_or_default()
}

/// Convert service results into GraphQL results with `extensions.code` set.
pub(crate) trait IntoGraphqlResult<T> {
    fn into_gql(self) -> async_graphql::Result<T>;
}

impl<T, E> IntoGraphqlResult<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn into_gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| Into::<AppError>::into(e).extend())
    }
}
