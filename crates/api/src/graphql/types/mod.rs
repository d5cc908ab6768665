//! GraphQL output types.

pub mod common;
pub mod order;
pub mod tag;

pub use common::{Account, Currency, Money, PageInfo, Shop, SortOrder};
pub use order::{
    Order, OrderFulfillmentGroup, OrderItem, OrdersByAccountIdConnection,
    OrdersByAccountIdSortByField,
};
pub use tag::Tag;
