//! HTTP route definitions.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /graphql` | GraphQL execution |
//! | `GET /graphql` | GraphiQL explorer, when enabled |
//! | `GET /health` | Liveness |
//! | `GET /health/ready` | Readiness (store reachable) |

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Extension, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
};

use crate::error::AppError;
use crate::graphql::OrderDeskSchema;
use crate::services::access::Viewer;
use crate::state::AppState;

/// Build the router. The schema is expected as an [`Extension`] layer.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Execute a GraphQL request as the viewer named by the gateway headers.
#[tracing::instrument(skip_all, fields(account_id))]
async fn graphql_handler(
    Extension(schema): Extension<OrderDeskSchema>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let viewer = Viewer::from_headers(&headers);
    if let Some(account_id) = &viewer.account_id {
        tracing::Span::current().record("account_id", account_id.as_str());
    }

    schema.execute(request.into_inner().data(viewer)).await.into()
}

async fn graphiql(State(state): State<AppState>) -> Response {
    if !state.config().graphiql {
        return AppError::NotFound("GraphiQL is disabled".to_owned()).into_response();
    }
    Html(GraphiQLSource::build().endpoint("/graphql").finish()).into_response()
}

async fn health() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
