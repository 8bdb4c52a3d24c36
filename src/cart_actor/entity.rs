use crate::actor_framework::Entity;
use crate::domain::{Cart, CartLine, UserId};
use super::actions::{CartAction, CartActionResult};

impl Entity for Cart {
    type Id = UserId;
    type CreateParams = ();
    type Patch = ();
    type Action = CartAction;
    type ActionResult = CartActionResult;

    fn id(&self) -> &UserId { &self.user_id }

    /// Carts are keyed by their owner and created lazily through upserts.
    fn from_create(user_id: UserId, _params: ()) -> Result<Self, String> {
        Ok(Cart::empty(user_id))
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Err("carts change only through cart actions".to_string())
    }

    fn handle_action(&mut self, action: CartAction) -> Result<CartActionResult, String> {
        match action {
            CartAction::Add { product_id, quantity, available } => {
                let current = self.quantity_of(&product_id);
                let wanted = current.saturating_add(quantity.max(1));
                if wanted > available {
                    return Ok(CartActionResult::ExceedsStock { available });
                }
                match self.items.iter_mut().find(|line| line.product_id == product_id) {
                    Some(line) => line.quantity = wanted,
                    None => self.items.push(CartLine { product_id, quantity: wanted }),
                }
            }
            CartAction::Remove(product_id) => {
                self.items.retain(|line| line.product_id != product_id);
            }
            CartAction::Clear => self.items.clear(),
            CartAction::Prune(missing) => {
                self.items.retain(|line| !missing.contains(&line.product_id));
            }
            CartAction::Checkout { order_id, lines } => {
                if self.last_checkout.as_ref() != Some(&order_id) {
                    for ordered in &lines {
                        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == ordered.product_id) {
                            line.quantity = line.quantity.saturating_sub(ordered.quantity);
                        }
                    }
                    self.items.retain(|line| line.quantity > 0);
                    self.last_checkout = Some(order_id);
                }
            }
        }
        Ok(CartActionResult::Updated(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, ProductId};

    fn add(product: &str, quantity: u32, available: u32) -> CartAction {
        CartAction::Add { product_id: ProductId::new(product), quantity, available }
    }

    fn cart_of(result: CartActionResult) -> Cart {
        match result {
            CartActionResult::Updated(cart) => cart,
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_add_merges_into_existing_line() {
        let mut cart = Cart::from_create(UserId::new("user_1"), ()).unwrap();
        cart.handle_action(add("product_1", 1, 10)).unwrap();
        let cart = cart_of(cart.clone().handle_action(add("product_1", 2, 10)).unwrap());
        assert_eq!(cart.items, vec![CartLine { product_id: ProductId::new("product_1"), quantity: 3 }]);
    }

    #[test]
    fn test_add_coerces_zero_quantity_and_respects_stock() {
        let mut cart = Cart::empty(UserId::new("user_1"));
        cart.handle_action(add("product_1", 0, 2)).unwrap();
        assert_eq!(cart.quantity_of(&ProductId::new("product_1")), 1);

        let refused = cart.handle_action(add("product_1", 2, 2)).unwrap();
        assert_eq!(refused, CartActionResult::ExceedsStock { available: 2 });
        assert_eq!(cart.quantity_of(&ProductId::new("product_1")), 1);
    }

    #[test]
    fn test_checkout_removes_ordered_quantities_once() {
        let mut cart = Cart::empty(UserId::new("user_1"));
        cart.handle_action(add("product_1", 3, 10)).unwrap();
        cart.handle_action(add("product_2", 1, 10)).unwrap();

        let checkout = CartAction::Checkout {
            order_id: OrderId::new("order_1"),
            lines: vec![CartLine { product_id: ProductId::new("product_1"), quantity: 2 },
                        CartLine { product_id: ProductId::new("product_2"), quantity: 1 }],
        };
        cart.handle_action(checkout.clone()).unwrap();
        cart.handle_action(checkout).unwrap();

        assert_eq!(cart.items, vec![CartLine { product_id: ProductId::new("product_1"), quantity: 1 }]);
        assert_eq!(cart.last_checkout, Some(OrderId::new("order_1")));
    }

    #[test]
    fn test_prune_and_remove() {
        let mut cart = Cart::empty(UserId::new("user_1"));
        cart.handle_action(add("product_1", 1, 10)).unwrap();
        cart.handle_action(add("product_2", 1, 10)).unwrap();
        cart.handle_action(CartAction::Prune(vec![ProductId::new("product_2")])).unwrap();
        cart.handle_action(CartAction::Remove(ProductId::new("product_9"))).unwrap();
        assert_eq!(cart.items.len(), 1);
        cart.handle_action(CartAction::Clear).unwrap();
        assert!(cart.is_empty());
    }
}
