//! Order lookups, listings and administration through the GraphQL schema.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::{Value, json};

use order_desk_api::services::access::Viewer;
use order_desk_core::ShopId;
use order_desk_integration_tests::{TestContext, error_code, iou, standard_order};

const ORDERS_BY_ACCOUNT: &str = r"
query Orders(
  $accountId: ID!
  $orderStatus: [String!]
  $shopIds: [ID!]
  $first: Int
  $after: String
) {
  ordersByAccountId(
    accountId: $accountId
    orderStatus: $orderStatus
    shopIds: $shopIds
    first: $first
    after: $after
  ) {
    totalCount
    edges { cursor node { _id } }
    nodes { _id createdAt status { status } }
    pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
  }
}
";

const UPDATE_ORDER: &str = r"
mutation Update($input: UpdateOrderInput!) {
  updateOrder(input: $input) {
    clientMutationId
    order { _id email updatedAt status { status label } }
  }
}
";

const UPDATE_GROUP: &str = r"
mutation Track($input: UpdateOrderFulfillmentGroupInput!) {
  updateOrderFulfillmentGroup(input: $input) {
    clientMutationId
    order { fulfillmentGroups { _id tracking } }
  }
}
";

fn admin() -> Viewer {
    Viewer::shop_admin("staff-1", [ShopId::new("shop-main")])
}

/// Place `count` orders for `account`, oldest first, and return their IDs.
async fn place_orders(ctx: &TestContext, account: &str, count: usize) -> Vec<String> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let response = ctx
            .place_order(Viewer::account(account), standard_order(), json!([iou(None)]))
            .await;
        let id = response["data"]["placeOrder"]["orders"][0]["_id"]
            .as_str()
            .unwrap_or_else(|| panic!("order not placed: {response}"));
        ids.push(id.to_owned());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    ids
}

async fn list(ctx: &TestContext, viewer: Viewer, variables: Value) -> Value {
    let response = ctx.execute(ORDERS_BY_ACCOUNT, variables, viewer).await;
    assert!(response["errors"].is_null(), "unexpected errors: {response}");
    response["data"]["ordersByAccountId"].clone()
}

fn node_ids(connection: &Value) -> Vec<String> {
    connection["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["_id"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn test_orders_default_to_newest_first() {
    let ctx = TestContext::new();
    let mut ids = place_orders(&ctx, "acct-1", 3).await;
    place_orders(&ctx, "acct-2", 1).await;

    let connection = list(&ctx, Viewer::account("acct-1"), json!({ "accountId": "acct-1" })).await;
    ids.reverse();
    assert_eq!(node_ids(&connection), ids);
    assert_eq!(connection["totalCount"], 3);

    let ascending = ctx
        .execute(
            r#"{ ordersByAccountId(accountId: "acct-1", sortOrder: asc, sortBy: createdAt) { nodes { _id } } }"#,
            json!({}),
            Viewer::account("acct-1"),
        )
        .await;
    ids.reverse();
    assert_eq!(node_ids(&ascending["data"]["ordersByAccountId"]), ids);
}

#[tokio::test]
async fn test_cursor_pagination_walks_every_order() {
    let ctx = TestContext::new();
    let placed = place_orders(&ctx, "acct-1", 5).await;

    let mut seen = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let page = list(
            &ctx,
            Viewer::account("acct-1"),
            json!({ "accountId": "acct-1", "first": 2, "after": after }),
        )
        .await;

        let edges = page["edges"].as_array().unwrap();
        let nodes = node_ids(&page);
        assert!(nodes.len() <= 2);
        assert_eq!(edges.len(), nodes.len());
        assert_eq!(page["totalCount"], 5);
        assert_eq!(page["pageInfo"]["startCursor"], edges[0]["cursor"]);
        assert_eq!(page["pageInfo"]["endCursor"], edges[edges.len() - 1]["cursor"]);
        assert_eq!(page["pageInfo"]["hasPreviousPage"], after.is_some());

        seen.extend(nodes);
        if !page["pageInfo"]["hasNextPage"].as_bool().unwrap() {
            break;
        }
        after = Some(page["pageInfo"]["endCursor"].as_str().unwrap().to_owned());
    }

    let mut expected = placed;
    expected.reverse();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_orders_filtered_by_status() {
    let ctx = TestContext::new();
    let ids = place_orders(&ctx, "acct-1", 2).await;
    let response = ctx
        .execute(
            UPDATE_ORDER,
            json!({ "input": { "orderId": ids[0], "status": "coreOrderWorkflow/processing" } }),
            admin(),
        )
        .await;
    assert!(response["errors"].is_null(), "unexpected errors: {response}");

    let processing = list(
        &ctx,
        Viewer::account("acct-1"),
        json!({ "accountId": "acct-1", "orderStatus": ["coreOrderWorkflow/processing"] }),
    )
    .await;
    assert_eq!(node_ids(&processing), vec![ids[0].clone()]);

    let bad_status = ctx
        .execute(
            ORDERS_BY_ACCOUNT,
            json!({ "accountId": "acct-1", "orderStatus": ["shipped"] }),
            Viewer::account("acct-1"),
        )
        .await;
    assert_eq!(error_code(&bad_status), Some("BAD_USER_INPUT"));
}

#[tokio::test]
async fn test_account_orders_are_private() {
    let ctx = TestContext::new();
    place_orders(&ctx, "acct-1", 1).await;

    let stranger = ctx
        .execute(ORDERS_BY_ACCOUNT, json!({ "accountId": "acct-1" }), Viewer::account("acct-2"))
        .await;
    assert_eq!(error_code(&stranger), Some("FORBIDDEN"));

    let admin_without_shops = ctx
        .execute(ORDERS_BY_ACCOUNT, json!({ "accountId": "acct-1" }), admin())
        .await;
    assert_eq!(error_code(&admin_without_shops), Some("FORBIDDEN"));

    let scoped = list(
        &ctx,
        admin(),
        json!({ "accountId": "acct-1", "shopIds": ["shop-main"] }),
    )
    .await;
    assert_eq!(scoped["totalCount"], 1);
}

#[tokio::test]
async fn test_invalid_pagination_arguments() {
    let ctx = TestContext::new();
    let response = ctx
        .execute(
            ORDERS_BY_ACCOUNT,
            json!({ "accountId": "acct-1", "first": 0 }),
            Viewer::account("acct-1"),
        )
        .await;
    assert_eq!(error_code(&response), Some("BAD_USER_INPUT"));

    let response = ctx
        .execute(
            ORDERS_BY_ACCOUNT,
            json!({ "accountId": "acct-1", "after": "not-a-cursor" }),
            Viewer::account("acct-1"),
        )
        .await;
    assert_eq!(error_code(&response), Some("BAD_USER_INPUT"));
}

#[tokio::test]
async fn test_lookup_of_missing_order_is_null() {
    let ctx = TestContext::new();
    let ids = place_orders(&ctx, "acct-1", 1).await;

    let query = r"query($id: ID!, $shop: ID!) { orderById(id: $id, shopId: $shop) { _id } }";
    let missing = ctx
        .execute(query, json!({ "id": "nope", "shop": "shop-main" }), admin())
        .await;
    assert!(missing["errors"].is_null());
    assert!(missing["data"]["orderById"].is_null());

    let other_shop = ctx
        .execute(query, json!({ "id": ids[0], "shop": "shop-eu" }), admin())
        .await;
    assert!(other_shop["data"]["orderById"].is_null());

    let owner = ctx
        .execute(query, json!({ "id": ids[0], "shop": "shop-main" }), Viewer::account("acct-1"))
        .await;
    assert_eq!(owner["data"]["orderById"]["_id"], ids[0]);
}

#[tokio::test]
async fn test_update_order_follows_workflow() {
    let ctx = TestContext::new();
    let ids = place_orders(&ctx, "acct-1", 1).await;
    let update = |status: &str| {
        json!({ "input": { "clientMutationId": "u-1", "orderId": ids[0], "status": status } })
    };

    let response = ctx
        .execute(UPDATE_ORDER, update("coreOrderWorkflow/processing"), admin())
        .await;
    let payload = &response["data"]["updateOrder"];
    assert_eq!(payload["clientMutationId"], "u-1");
    assert_eq!(
        payload["order"]["status"],
        json!({ "status": "coreOrderWorkflow/processing", "label": "Processing" })
    );

    let skipped_back = ctx
        .execute(UPDATE_ORDER, update("new"), admin())
        .await;
    assert_eq!(error_code(&skipped_back), Some("BAD_USER_INPUT"));

    let completed = ctx
        .execute(UPDATE_ORDER, update("coreOrderWorkflow/completed"), admin())
        .await;
    assert!(completed["errors"].is_null(), "unexpected errors: {completed}");

    let after_terminal = ctx
        .execute(UPDATE_ORDER, update("coreOrderWorkflow/canceled"), admin())
        .await;
    assert_eq!(error_code(&after_terminal), Some("BAD_USER_INPUT"));
}

#[tokio::test]
async fn test_update_order_requires_shop_admin() {
    let ctx = TestContext::new();
    let ids = place_orders(&ctx, "acct-1", 1).await;
    let input = json!({ "input": { "orderId": ids[0], "email": "new@example.com" } });

    let owner = ctx
        .execute(UPDATE_ORDER, input.clone(), Viewer::account("acct-1"))
        .await;
    assert_eq!(error_code(&owner), Some("FORBIDDEN"));

    let response = ctx.execute(UPDATE_ORDER, input, admin()).await;
    assert_eq!(
        response["data"]["updateOrder"]["order"]["email"],
        "new@example.com"
    );

    let missing = ctx
        .execute(
            UPDATE_ORDER,
            json!({ "input": { "orderId": "nope", "status": "coreOrderWorkflow/canceled" } }),
            admin(),
        )
        .await;
    assert_eq!(error_code(&missing), Some("NOT_FOUND"));
}

#[tokio::test]
async fn test_update_fulfillment_group_tracking() {
    let ctx = TestContext::new();
    let response = ctx
        .place_order(Viewer::account("acct-1"), standard_order(), json!([iou(None)]))
        .await;
    let order = &response["data"]["placeOrder"]["orders"][0];
    let order_id = order["_id"].as_str().unwrap();
    let group_id = order["fulfillmentGroups"][0]["_id"].as_str().unwrap();
    let track = |tracking: Option<&str>| {
        json!({ "input": {
            "clientMutationId": "t-1",
            "orderId": order_id,
            "orderFulfillmentGroupId": group_id,
            "tracking": tracking,
        } })
    };

    let response = ctx
        .execute(UPDATE_GROUP, track(Some("  1Z999AA10123456784 ")), admin())
        .await;
    let payload = &response["data"]["updateOrderFulfillmentGroup"];
    assert_eq!(payload["clientMutationId"], "t-1");
    assert_eq!(
        payload["order"]["fulfillmentGroups"][0]["tracking"],
        "1Z999AA10123456784"
    );

    let cleared = ctx.execute(UPDATE_GROUP, track(None), admin()).await;
    assert!(
        cleared["data"]["updateOrderFulfillmentGroup"]["order"]["fulfillmentGroups"][0]["tracking"]
            .is_null()
    );

    let unknown_group = ctx
        .execute(
            UPDATE_GROUP,
            json!({ "input": { "orderId": order_id, "orderFulfillmentGroupId": "nope" } }),
            admin(),
        )
        .await;
    assert_eq!(error_code(&unknown_group), Some("NOT_FOUND"));
}
