//! Cart documents, one per user, created on first add.

mod actions;
pub mod entity;

pub use actions::*;

use crate::actor_framework::{ResourceActor, ResourceClient};
use crate::domain::{Cart, UserId};

/// Creates a new Cart actor and its store client.
///
/// Carts are always addressed by owner, so generated ids are never used for lookups.
pub fn new(buffer_size: usize) -> (ResourceActor<Cart>, ResourceClient<Cart>) {
    ResourceActor::new(buffer_size, || UserId::new("anonymous"))
}
