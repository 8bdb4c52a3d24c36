//! Storefront order placement over actor-backed document stores.
//!
//! Products, carts, and orders each live in their own [`ResourceActor`](actor_framework::ResourceActor).
//! Stock is reserved with per-document atomic actions and compensated on
//! failure, so concurrent orders can never oversell. Catalog reads are served
//! through a fail-open [`ReadCache`](cache::ReadCache).

pub mod actor_framework;
pub mod app_system;
pub mod cache;
pub mod cart_actor;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod order_actor;
pub mod product_actor;

#[cfg(test)]
mod mock_framework;

pub use app_system::{setup_tracing, StorefrontSystem};
pub use config::StorefrontConfig;
pub use error::{StorefrontError, StorefrontResult};
