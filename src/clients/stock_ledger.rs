use tracing::{debug, error, info, instrument, warn};

use super::retry::RetryPolicy;
use crate::actor_framework::ResourceClient;
use crate::domain::{Money, Product, ProductId};
use crate::error::{StorefrontError, StorefrontResult};
use crate::product_actor::{ProductAction, ProductActionResult};

/// Outcome of a reservation attempt. Shortage is an answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Stock was decremented. `price` is the unit price at that moment.
    Held { price: Money, remaining: u32 },
    Insufficient { available: u32 },
}

/// Conditional reserve and compensating release over the product store.
///
/// Every operation is a single atomic action on one product document, so two
/// concurrent reservations can never both succeed against the same units.
#[derive(Clone)]
pub struct StockLedger {
    inner: ResourceClient<Product>,
    retry: RetryPolicy,
}

impl StockLedger {
    pub fn new(inner: ResourceClient<Product>, retry: RetryPolicy) -> Self {
        Self { inner, retry }
    }

    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: ProductId) -> StorefrontResult<u32> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::CheckStock).await? {
            ProductActionResult::StockLevel(level) => Ok(level),
            other => Err(unexpected(other)),
        }
    }

    /// Decrements stock by `quantity` if at least that much is available.
    ///
    /// Once the request is queued its outcome is awaited without a deadline:
    /// a reservation that happened is never reported as a failure.
    #[instrument(skip(self))]
    pub async fn try_reserve(&self, id: ProductId, quantity: u32) -> StorefrontResult<Reservation> {
        debug!("Sending request");
        match self
            .inner
            .perform_action_to_completion(id, ProductAction::TryReserve(quantity))
            .await?
        {
            ProductActionResult::Reserved { price, remaining } => {
                debug!(remaining, "Stock reserved");
                Ok(Reservation::Held { price, remaining })
            }
            ProductActionResult::Insufficient { available } => {
                info!(available, "Reservation refused");
                Ok(Reservation::Insufficient { available })
            }
            other => Err(unexpected(other)),
        }
    }

    /// Compensating increment. Returns the stock level afterwards.
    #[instrument(skip(self))]
    pub async fn release(&self, id: ProductId, quantity: u32) -> StorefrontResult<u32> {
        debug!("Sending request");
        match self
            .inner
            .perform_action_to_completion(id, ProductAction::Release(quantity))
            .await?
        {
            ProductActionResult::Released { stock } => Ok(stock),
            other => Err(unexpected(other)),
        }
    }

    /// Releases with retries, continuing in the background if the store stays
    /// unavailable. A product that was deleted meanwhile has nothing to
    /// release into; that is logged and otherwise ignored.
    #[instrument(skip(self))]
    pub async fn release_until_settled(&self, id: ProductId, quantity: u32) {
        let ledger = self.clone();
        let product_id = id.clone();
        let outcome = self
            .retry
            .run_until_success("release_stock", move || {
                let ledger = ledger.clone();
                let product_id = product_id.clone();
                async move { ledger.release(product_id, quantity).await.map(|_| ()) }
            })
            .await;

        match outcome {
            Ok(()) => {}
            Err(StorefrontError::NotFound(_)) => {
                warn!(product_id = %id, quantity, "Product deleted before its stock could be released");
            }
            Err(e) => error!(product_id = %id, quantity, error = %e, "Stock release failed permanently"),
        }
    }
}

impl_store_reads!(StockLedger, inner, Product, ProductId, product);

fn unexpected(result: ProductActionResult) -> StorefrontError {
    StorefrontError::TransientStore(format!("Unexpected stock ledger result: {:?}", result))
}
