//! Shared GraphQL objects: money, references, pagination.

use async_graphql::{Enum, ID, Object, SimpleObject};

use order_desk_core::pagination;
use order_desk_core::{AccountId, CurrencyCode, ShopId};

/// Wrap a core `Page<T>` in a named connection type with `edges`, `nodes`,
/// `pageInfo` and `totalCount`.
macro_rules! define_connection {
    ($(#[$meta:meta])* $connection:ident, $edge:ident, $node:ty) => {
        /// An edge of a cursor-paginated list.
        #[derive(Debug, Clone, ::async_graphql::SimpleObject)]
        pub struct $edge {
            /// Opaque cursor pointing at this node.
            pub cursor: String,
            pub node: $node,
        }

        $(#[$meta])*
        #[derive(Debug, Clone, ::async_graphql::SimpleObject)]
        pub struct $connection {
            pub edges: Vec<$edge>,
            /// The nodes of `edges`, for clients that do not need cursors.
            pub nodes: Vec<$node>,
            pub page_info: $crate::graphql::types::PageInfo,
            /// Nodes matching the query before cursors and limits are applied.
            pub total_count: i32,
        }

        impl $connection {
            /// Convert a page of domain values into the connection type.
            pub fn from_page<T>(page: ::order_desk_core::pagination::Page<T>) -> Self
            where
                $node: From<T>,
            {
                let total_count = i32::try_from(page.total_count).unwrap_or(i32::MAX);
                let page_info = $crate::graphql::types::PageInfo::from(page.page_info);
                let edges: Vec<$edge> = page
                    .edges
                    .into_iter()
                    .map(|edge| $edge {
                        cursor: edge.cursor,
                        node: <$node>::from(edge.node),
                    })
                    .collect();
                let nodes = edges.iter().map(|edge| edge.node.clone()).collect();
                Self {
                    edges,
                    nodes,
                    page_info,
                    total_count,
                }
            }
        }
    };
}

pub(crate) use define_connection;

/// Relay page information.
#[derive(Debug, Clone, SimpleObject)]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
}

impl From<pagination::PageInfo> for PageInfo {
    fn from(info: pagination::PageInfo) -> Self {
        Self {
            end_cursor: info.end_cursor,
            has_next_page: info.has_next_page,
            has_previous_page: info.has_previous_page,
            start_cursor: info.start_cursor,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(rename_items = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for pagination::SortOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Self::Asc,
            SortOrder::Desc => Self::Desc,
        }
    }
}

/// Build a core page request from connection arguments.
#[must_use]
pub fn page_request(
    after: Option<String>,
    before: Option<String>,
    first: Option<i32>,
    last: Option<i32>,
    offset: Option<i32>,
) -> pagination::PageRequest {
    pagination::PageRequest {
        after,
        before,
        first,
        last,
        offset,
    }
}

/// A monetary amount.
#[derive(Debug, Clone, Copy)]
pub struct Money(pub order_desk_core::Money);

#[Object]
impl Money {
    /// Amount in the currency's standard unit.
    async fn amount(&self) -> f64 {
        self.0.to_f64()
    }

    async fn currency(&self) -> Currency {
        Currency(self.0.currency_code)
    }

    /// Amount formatted for display, e.g. `$19.99`.
    async fn display_amount(&self) -> String {
        self.0.display()
    }
}

impl From<order_desk_core::Money> for Money {
    fn from(money: order_desk_core::Money) -> Self {
        Self(money)
    }
}

/// A currency.
#[derive(Debug, Clone, Copy)]
pub struct Currency(pub CurrencyCode);

#[Object]
impl Currency {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.code())
    }

    /// ISO 4217 code.
    async fn code(&self) -> &'static str {
        self.0.code()
    }

    async fn symbol(&self) -> &'static str {
        self.0.symbol()
    }
}

/// Reference to an account owned by the accounts subsystem.
#[derive(Debug, Clone)]
pub struct Account(pub AccountId);

#[Object]
impl Account {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.as_str())
    }
}

/// Reference to a shop.
#[derive(Debug, Clone)]
pub struct Shop(pub ShopId);

#[Object]
impl Shop {
    #[graphql(name = "_id")]
    async fn id(&self) -> ID {
        ID::from(self.0.as_str())
    }
}
