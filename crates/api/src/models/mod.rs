//! Order domain types.
//!
//! These types are the persisted shape of orders (serialized as JSON
//! documents) and are separate from the GraphQL wrappers in [`crate::graphql`].

pub mod cart;
pub mod order;

pub use cart::Cart;
pub use order::*;
