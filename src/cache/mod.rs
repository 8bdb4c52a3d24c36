//! Read cache for catalog results.
//!
//! The cache is never authoritative: every entry can be recomputed from the
//! product store, and every failure of the backend degrades to a miss.

pub mod backend;
pub mod key;
pub mod memory;
pub mod read_cache;

pub use backend::{CacheBackend, CacheError};
pub use key::{CacheKey, Invalidation, LISTING_PREFIX, PRODUCT_PREFIX};
pub use memory::{CacheHandle, CacheService};
pub use read_cache::{FillTicket, ReadCache};
