//! Error types for cart store operations.

use crate::model::{CartId, ItemId};

/// Error type for cart store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// No cart with this identifier is live (never existed, deleted, or evicted).
    #[error("Cart with id {0} does not exist")]
    NotFound(CartId),

    /// The cart already holds an item with this identifier.
    #[error("Product with id {item_id} is already in the cart")]
    DuplicateItem { cart_id: CartId, item_id: ItemId },

    /// The item is structurally malformed.
    #[error("Invalid item: {0}")]
    InvalidInput(String),
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartError>;

/// Error reported by an [`EvictionListener`](crate::EvictionListener).
///
/// Listener failures never stop a sweep; they are logged and counted.
#[derive(Debug, thiserror::Error)]
#[error("Eviction listener failed: {0}")]
pub struct EvictionError(pub String);

impl EvictionError {
    /// Create a listener error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
