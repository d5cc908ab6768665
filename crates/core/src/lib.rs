//! Order Desk Core - Shared types library.
//!
//! This crate provides common types used across all Order Desk components:
//! - `api` - GraphQL order-management service
//! - `cli` - Command-line tools for migrations and schema export
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and order statuses
//! - [`pagination`] - Relay-style cursor pagination over in-memory result sets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod types;

pub use types::*;
