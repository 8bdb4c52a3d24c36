use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::ProductId;

pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// Errors reported to the request layer.
///
/// Stock-related variants always name the product and the quantity actually
/// available so the caller can offer a corrected quantity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorefrontError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Insufficient stock for {product_id}: requested {requested}, only {available} available")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Product {product_id} is no longer available")]
    ProductUnavailable { product_id: ProductId },
    #[error("Store temporarily unavailable: {0}")]
    TransientStore(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl StorefrontError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Only store I/O failures are worth retrying; everything else is a
    /// deterministic answer about the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

impl From<FrameworkError> for StorefrontError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(id) => Self::NotFound(id),
            FrameworkError::Rejected(msg) => Self::Validation(msg),
            other => Self::TransientStore(other.to_string()),
        }
    }
}
