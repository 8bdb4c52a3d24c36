use crate::domain::{Cart, CartLine, OrderId, ProductId};

/// Atomic mutations of a single user's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Merge `quantity` into the product's line, refusing to exceed `available`.
    Add { product_id: ProductId, quantity: u32, available: u32 },
    Remove(ProductId),
    Clear,
    /// Drop lines referencing products that no longer exist.
    Prune(Vec<ProductId>),
    /// Remove the lines an order was placed for. Idempotent per order id.
    Checkout { order_id: OrderId, lines: Vec<CartLine> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartActionResult {
    Updated(Cart),
    /// The merged quantity would exceed the stock the caller observed.
    ExceedsStock { available: u32 },
}
