//! Business logic behind the GraphQL resolvers.

pub mod access;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod reference;

pub use access::Viewer;
pub use catalog::Catalog;
pub use orders::OrderService;
pub use payments::PaymentMethodRegistry;
