use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument, Span};

use super::cart_client::CartClient;
use super::require_admin;
use super::retry::RetryPolicy;
use super::stock_ledger::{Reservation, StockLedger};
use crate::actor_framework::ResourceClient;
use crate::cache::{CacheKey, ReadCache, LISTING_PREFIX};
use crate::domain::{Caller, CartLine, Order, OrderCreate, OrderId, OrderItem, ProductId, UserId};
use crate::error::{StorefrontError, StorefrontResult};

/// Order placement and order history.
///
/// Placement reserves stock product by product, in ascending product id
/// order, and compensates every reservation already taken if a later one
/// fails. Creating the order record is the commit point: after it nothing is
/// rolled back, and clearing the cart is retried until it sticks.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    carts: CartClient,
    ledger: StockLedger,
    cache: Arc<ReadCache>,
    retry: RetryPolicy,
}

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        carts: CartClient,
        ledger: StockLedger,
        cache: Arc<ReadCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self { inner, carts, ledger, cache, retry }
    }

    /// Converts the user's cart into an order, all or nothing.
    ///
    /// Reservation, commit and rollback run on their own task, so a caller
    /// that stops waiting cannot leave stock reserved without an order.
    #[instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> StorefrontResult<Order> {
        info!("Processing place_order request");

        // Step 1: Load the cart
        let cart = match self.carts.load_cart(user_id.clone()).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => {
                info!("Cart is empty");
                return Err(StorefrontError::EmptyCart);
            }
        };

        // A fixed acquisition order keeps concurrent multi-product orders from
        // starving each other.
        let mut lines = cart.items;
        lines.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let client = self.clone();
        let placement = tokio::spawn(
            async move { client.reserve_and_commit(user_id, lines).await }.instrument(Span::current()),
        );
        placement.await.map_err(|e| {
            error!(error = %e, "Placement task failed");
            StorefrontError::TransientStore(format!("order placement interrupted: {}", e))
        })?
    }

    async fn reserve_and_commit(&self, user_id: UserId, lines: Vec<CartLine>) -> StorefrontResult<Order> {
        // Step 2: Every line must still reference a product
        let mut names = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.ledger.find_product(line.product_id.clone()).await? {
                Some(product) => names.push(product.name),
                None => {
                    warn!(product_id = %line.product_id, "Cart references a deleted product");
                    return Err(StorefrontError::ProductUnavailable {
                        product_id: line.product_id.clone(),
                    });
                }
            }
        }

        // Step 3: Reserve, capturing the price each reservation was taken at
        let mut held: Vec<OrderItem> = Vec::with_capacity(lines.len());
        for (line, name) in lines.iter().zip(names) {
            let failure = match self.ledger.try_reserve(line.product_id.clone(), line.quantity).await {
                Ok(Reservation::Held { price, .. }) => {
                    held.push(OrderItem {
                        product_id: line.product_id.clone(),
                        name,
                        quantity: line.quantity,
                        price_at_purchase: price,
                    });
                    continue;
                }
                Ok(Reservation::Insufficient { available }) => StorefrontError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available,
                },
                Err(StorefrontError::NotFound(_)) => StorefrontError::ProductUnavailable {
                    product_id: line.product_id.clone(),
                },
                Err(e) => e,
            };

            // Step 4: Compensate everything taken so far
            warn!(product_id = %line.product_id, error = %failure, held = held.len(), "Reservation failed, rolling back");
            self.roll_back(&held).await;
            return Err(failure);
        }

        // Step 5: Commit point
        let order = match self
            .inner
            .create_to_completion(OrderCreate {
                user_id,
                items: held.clone(),
            })
            .await
        {
            Ok(order) => order,
            Err(e) => {
                error!(error = %e, "Order record could not be written, rolling back");
                self.roll_back(&held).await;
                return Err(e.into());
            }
        };
        info!(order_id = %order.id, total = %order.total, "Order placed");

        // Step 6: Remove the ordered lines from the cart
        self.settle_cart(&order).await;

        // Step 7: Stock changed for every ordered product
        self.invalidate_stock(order.items.iter().map(|item| &item.product_id)).await;

        Ok(order)
    }

    /// The caller's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn get_my_orders(&self, user_id: UserId) -> StorefrontResult<Vec<Order>> {
        let mut orders = self.inner.query(move |order| order.user_id == user_id).await?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    /// Every order in the store, newest first. Admin only.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn get_all_orders(&self, caller: &Caller) -> StorefrontResult<Vec<Order>> {
        require_admin(caller, "list all orders")?;
        let mut orders = self.inner.query(|_| true).await?;
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    /// A single order, visible to its owner and to admins.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn get_order(&self, caller: &Caller, id: OrderId) -> StorefrontResult<Order> {
        let order = self.require_order(id).await?;
        if order.user_id != caller.user_id && !caller.is_admin() {
            // Indistinguishable from a missing order for other customers.
            return Err(StorefrontError::not_found(format!("order {}", order.id)));
        }
        Ok(order)
    }

    async fn roll_back(&self, held: &[OrderItem]) {
        for item in held.iter().rev() {
            self.ledger
                .release_until_settled(item.product_id.clone(), item.quantity)
                .await;
        }
        // A reader may have cached the decremented stock in between.
        self.invalidate_stock(held.iter().map(|item| &item.product_id)).await;
    }

    async fn settle_cart(&self, order: &Order) {
        let carts = self.carts.clone();
        let user_id = order.user_id.clone();
        let order_id = order.id.clone();
        let lines: Vec<CartLine> = order
            .items
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect();

        let outcome = self
            .retry
            .run_until_success("clear_cart_after_order", move || {
                let carts = carts.clone();
                let user_id = user_id.clone();
                let order_id = order_id.clone();
                let lines = lines.clone();
                async move { carts.settle_checkout(user_id, order_id, lines).await.map(|_| ()) }
            })
            .await;

        // The order stands either way; the next cart read settles it again.
        if let Err(e) = outcome {
            error!(order_id = %order.id, error = %e, "Cart could not be cleared after order");
        }
    }

    async fn invalidate_stock<'a>(&self, products: impl Iterator<Item = &'a ProductId>) {
        let mut touched = false;
        for product_id in products {
            self.cache.invalidate(&CacheKey::product(product_id)).await;
            touched = true;
        }
        if touched {
            self.cache.invalidate_by_prefix(LISTING_PREFIX).await;
        }
    }
}

impl_store_reads!(OrderClient, inner, Order, OrderId, order);

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.cmp_placement(a));
}
