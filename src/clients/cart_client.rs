use tracing::{debug, info, instrument, warn};

use super::stock_ledger::StockLedger;
use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::cart_actor::{CartAction, CartActionResult};
use crate::domain::{Cart, CartItemView, CartLine, CartView, Order, OrderId, ProductId, UserId};
use crate::error::{StorefrontError, StorefrontResult};

/// Per-user carts joined with live product data.
///
/// Cart documents only hold product ids and quantities. Names and prices are
/// always read fresh, so a cart view never shows a stale price.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<Cart>,
    ledger: StockLedger,
    orders: ResourceClient<Order>,
}

impl CartClient {
    pub fn new(inner: ResourceClient<Cart>, ledger: StockLedger, orders: ResourceClient<Order>) -> Self {
        Self { inner, ledger, orders }
    }

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// Quantities below one are treated as one. The merged quantity may not
    /// exceed the product's current stock.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> StorefrontResult<CartView> {
        if product_id.is_blank() {
            return Err(StorefrontError::validation("Product ID is required"));
        }
        let quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        let product = self.ledger.require_product(product_id.clone()).await?;

        let action = CartAction::Add {
            product_id: product_id.clone(),
            quantity,
            available: product.stock,
        };
        match self.inner.upsert_action(user_id, (), action).await? {
            CartActionResult::Updated(cart) => {
                debug!(lines = cart.items.len(), "Cart updated");
                Ok(self.join(&cart.items).await?.0)
            }
            CartActionResult::ExceedsStock { available } => {
                info!(available, "Add refused, not enough stock");
                Err(StorefrontError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                })
            }
        }
    }

    /// Removing a product that is not in the cart is not an error.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, user_id: UserId, product_id: ProductId) -> StorefrontResult<CartView> {
        if product_id.is_blank() {
            return Err(StorefrontError::validation("Product ID is required"));
        }
        match self.inner.perform_action(user_id, CartAction::Remove(product_id)).await {
            Ok(CartActionResult::Updated(cart)) => Ok(self.join(&cart.items).await?.0),
            Ok(CartActionResult::ExceedsStock { .. }) => Err(unexpected()),
            Err(FrameworkError::NotFound(_)) => Ok(CartView::empty()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: UserId) -> StorefrontResult<()> {
        match self.inner.perform_action(user_id, CartAction::Clear).await {
            Ok(_) | Err(FrameworkError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The user's cart with live totals. Lines whose product no longer exists
    /// are dropped from the stored cart.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> StorefrontResult<CartView> {
        let Some(cart) = self.load_cart(user_id.clone()).await? else {
            return Ok(CartView::empty());
        };

        let (view, missing) = self.join(&cart.items).await?;
        if !missing.is_empty() {
            info!(count = missing.len(), "Pruning lines for deleted products");
            match self.inner.perform_action(user_id, CartAction::Prune(missing)).await {
                Ok(_) => {}
                // The view is already correct; the next read prunes again.
                Err(e) => warn!(error = %e, "Failed to persist cart pruning"),
            }
        }
        Ok(view)
    }

    /// Item count and price of `lines` at current prices.
    #[instrument(skip(self, lines))]
    pub async fn get_totals(&self, lines: &[CartLine]) -> StorefrontResult<CartView> {
        Ok(self.join(lines).await?.0)
    }

    /// The stored cart, with any order that was placed from it but not yet
    /// removed from it settled first.
    #[instrument(skip(self))]
    pub async fn load_cart(&self, user_id: UserId) -> StorefrontResult<Option<Cart>> {
        let Some(cart) = self.inner.get(user_id.clone()).await? else {
            return Ok(None);
        };

        let owner = user_id.clone();
        let latest = self
            .orders
            .query(move |order| order.user_id == owner)
            .await?
            .into_iter()
            .max_by(|a, b| a.cmp_placement(b));

        match latest {
            Some(order) if cart.last_checkout.as_ref() != Some(&order.id) => {
                info!(order_id = %order.id, "Settling checkout left unfinished");
                let lines = order.items.iter().map(|item| CartLine {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
                self.settle_checkout(user_id, order.id.clone(), lines.collect()).await.map(Some)
            }
            _ => Ok(Some(cart)),
        }
    }

    /// Removes the ordered quantities from the cart. Applying the same order
    /// twice has no further effect.
    #[instrument(skip(self, lines))]
    pub async fn settle_checkout(&self, user_id: UserId, order_id: OrderId, lines: Vec<CartLine>) -> StorefrontResult<Cart> {
        match self.inner.upsert_action(user_id, (), CartAction::Checkout { order_id, lines }).await? {
            CartActionResult::Updated(cart) => Ok(cart),
            CartActionResult::ExceedsStock { .. } => Err(unexpected()),
        }
    }

    /// Joins lines with live product data, returning the view and the ids of
    /// products that no longer exist.
    async fn join(&self, lines: &[CartLine]) -> StorefrontResult<(CartView, Vec<ProductId>)> {
        let mut view = CartView::empty();
        let mut missing = Vec::new();

        for line in lines {
            match self.ledger.find_product(line.product_id.clone()).await? {
                Some(product) => {
                    let line_total = product.price.times(line.quantity);
                    view.total_items = view.total_items.saturating_add(line.quantity);
                    view.total_price = view.total_price + line_total;
                    view.items.push(CartItemView {
                        product: product.summary(),
                        quantity: line.quantity,
                        line_total,
                    });
                }
                None => missing.push(line.product_id.clone()),
            }
        }
        Ok((view, missing))
    }
}

fn unexpected() -> StorefrontError {
    StorefrontError::TransientStore("Unexpected cart action result".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RetryPolicy;
    use crate::domain::{Money, Product};
    use crate::mock_framework::{create_mock_client, expect_get};
    use chrono::Utc;
    use std::time::Duration;

    fn clients() -> (
        CartClient,
        tokio::sync::mpsc::Receiver<crate::actor_framework::ResourceRequest<Cart>>,
        tokio::sync::mpsc::Receiver<crate::actor_framework::ResourceRequest<Product>>,
    ) {
        let (carts, cart_rx) = create_mock_client::<Cart>(4);
        let (products, product_rx) = create_mock_client::<Product>(4);
        let (orders, _order_rx) = create_mock_client::<Order>(4);
        let ledger = StockLedger::new(products, RetryPolicy { attempts: 1, backoff: Duration::from_millis(1) });
        (CartClient::new(carts, ledger, orders), cart_rx, product_rx)
    }

    #[tokio::test]
    async fn test_blank_product_id_is_rejected() {
        let (client, mut cart_rx, mut product_rx) = clients();
        let result = client.add_to_cart(UserId::new("user_1"), ProductId::new("  "), 1).await;
        assert!(matches!(result, Err(StorefrontError::Validation(_))));
        assert!(cart_rx.try_recv().is_err());
        assert!(product_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let (client, mut cart_rx, mut product_rx) = clients();
        let task = tokio::spawn(async move { client.add_to_cart(UserId::new("user_1"), ProductId::new("product_9"), 1).await });

        let (_, responder) = expect_get(&mut product_rx).await.expect("Expected Get request");
        responder.send(Ok(None)).unwrap();

        assert!(matches!(task.await.unwrap(), Err(StorefrontError::NotFound(_))));
        assert!(cart_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_totals_use_live_prices_and_skip_missing_products() {
        let (client, _cart_rx, mut product_rx) = clients();
        let lines = vec![
            CartLine { product_id: ProductId::new("product_1"), quantity: 3 },
            CartLine { product_id: ProductId::new("product_2"), quantity: 1 },
        ];
        let task = tokio::spawn(async move { client.get_totals(&lines).await });

        let (id, responder) = expect_get(&mut product_rx).await.expect("Expected Get request");
        responder
            .send(Ok(Some(Product {
                id,
                name: "Mug".to_string(),
                description: "Stoneware".to_string(),
                price: Money::from_cents(250),
                stock: 10,
                category: "kitchen".to_string(),
                created_at: Utc::now(),
            })))
            .unwrap();
        let (_, responder) = expect_get(&mut product_rx).await.expect("Expected Get request");
        responder.send(Ok(None)).unwrap();

        let view = task.await.unwrap().unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total_items, 3);
        assert_eq!(view.total_price, Money::from_cents(750));
    }
}
