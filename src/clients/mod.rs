//! Typed clients over the store actors and the read cache.
//!
//! Each client turns one area of the storefront into async methods returning
//! [`StorefrontResult`], so request handlers never see actor messages.

#[macro_use]
mod macros;

pub mod cart_client;
pub mod catalog_client;
pub mod order_client;
pub mod retry;
pub mod stock_ledger;

pub use cart_client::CartClient;
pub use catalog_client::CatalogClient;
pub use order_client::OrderClient;
pub use retry::RetryPolicy;
pub use stock_ledger::{Reservation, StockLedger};

use crate::domain::Caller;
use crate::error::{StorefrontError, StorefrontResult};

pub(crate) fn require_admin(caller: &Caller, action: &str) -> StorefrontResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        tracing::warn!(caller = %caller.user_id, action, "Admin role required");
        Err(StorefrontError::unauthorized(format!("admin role required to {}", action)))
    }
}
