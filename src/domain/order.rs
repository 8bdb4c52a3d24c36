use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};

use super::{Money, OrderId, ProductId, UserId};

/// Represents a placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Placement order: by creation time, then by the store's id sequence for
    /// orders created within the same instant.
    pub fn cmp_placement(&self, other: &Order) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.sequence().cmp(&other.id.sequence()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// One order line with the price captured at placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price_at_purchase: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price_at_purchase.times(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
}

/// Parameters for creating an order. The total is derived from the items.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
}
