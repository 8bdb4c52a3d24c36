//! Immutable order records.

pub mod entity;

use crate::actor_framework::{ResourceActor, ResourceClient};
use crate::domain::{Order, OrderId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Creates a new Order actor and its store client.
pub fn new(buffer_size: usize) -> (ResourceActor<Order>, ResourceClient<Order>) {
    let order_id_counter = Arc::new(AtomicU64::new(1));
    let next_order_id = move || {
        let id = order_id_counter.fetch_add(1, Ordering::SeqCst);
        OrderId::new(format!("order_{}", id))
    };

    ResourceActor::new(buffer_size, next_order_id)
}
