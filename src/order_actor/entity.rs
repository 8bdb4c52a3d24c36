use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{Money, Order, OrderCreate, OrderId, OrderStatus};

impl Entity for Order {
    type Id = OrderId;
    type CreateParams = OrderCreate;
    type Patch = ();
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &OrderId { &self.id }

    /// Creates a new Order from creation parameters.
    ///
    /// The total is always the sum of the captured line prices; the order is
    /// initialized with status `Placed`.
    fn from_create(id: OrderId, params: OrderCreate) -> Result<Self, String> {
        if params.items.is_empty() {
            return Err("an order needs at least one item".to_string());
        }
        let total: Money = params.items.iter().map(|item| item.line_total()).sum();
        Ok(Self {
            id,
            user_id: params.user_id,
            items: params.items,
            total,
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Err(format!("order {} is immutable", self.id))
    }

    fn on_delete(&self) -> Result<(), String> {
        Err(format!("order {} is immutable", self.id))
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, ProductId, UserId};

    #[test]
    fn test_total_is_sum_of_captured_prices() {
        let order = Order::from_create(
            OrderId::new("order_1"),
            OrderCreate {
                user_id: UserId::new("user_1"),
                items: vec![
                    OrderItem {
                        product_id: ProductId::new("product_1"),
                        name: "Mug".into(),
                        quantity: 2,
                        price_at_purchase: Money::from_cents(1_000),
                    },
                    OrderItem {
                        product_id: ProductId::new("product_2"),
                        name: "Lamp".into(),
                        quantity: 1,
                        price_at_purchase: Money::from_cents(499),
                    },
                ],
            },
        )
        .unwrap();
        assert_eq!(order.total, Money::from_cents(2_499));
        assert_eq!(order.status, OrderStatus::Placed);
    }

    #[test]
    fn test_orders_reject_changes_and_empty_creation() {
        let empty = Order::from_create(
            OrderId::new("order_2"),
            OrderCreate { user_id: UserId::new("user_1"), items: vec![] },
        );
        assert!(empty.is_err());

        let mut order = Order::from_create(
            OrderId::new("order_3"),
            OrderCreate {
                user_id: UserId::new("user_1"),
                items: vec![OrderItem {
                    product_id: ProductId::new("product_1"),
                    name: "Mug".into(),
                    quantity: 1,
                    price_at_purchase: Money::from_cents(100),
                }],
            },
        )
        .unwrap();
        assert!(order.on_update(()).is_err());
        assert!(order.on_delete().is_err());
    }
}
