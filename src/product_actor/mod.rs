//! Product documents and the stock ledger actions evaluated on them.

mod actions;
pub mod entity;

pub use actions::*;

use crate::actor_framework::{ResourceActor, ResourceClient};
use crate::domain::{Product, ProductId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Creates a new Product actor and its store client.
pub fn new(buffer_size: usize) -> (ResourceActor<Product>, ResourceClient<Product>) {
    let product_id_counter = Arc::new(AtomicU64::new(1));
    let next_product_id = move || {
        let id = product_id_counter.fetch_add(1, Ordering::SeqCst);
        ProductId::new(format!("product_{}", id))
    };

    ResourceActor::new(buffer_size, next_product_id)
}
