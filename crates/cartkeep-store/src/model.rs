//! Cart and item types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CartError, Result};

/// Unique identifier for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(Uuid);

impl CartId {
    /// Create a new random cart ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CartId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of an item within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Wrap a raw identifier. Non-positive values fail [`Item::validate`].
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product reference attached to a cart.
///
/// Items are stored exactly as given; the store never rewrites the
/// description or the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier, unique within one cart.
    pub id: ItemId,
    /// Non-empty description.
    pub description: String,
    /// Positive monetary amount. Written as a JSON number, read from a
    /// number or a string.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
}

impl Item {
    /// Create a new item.
    pub fn new(id: impl Into<ItemId>, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            amount,
        }
    }

    /// Check the structural rules: positive id, non-blank description,
    /// positive amount.
    pub fn validate(&self) -> Result<()> {
        if self.id.get() <= 0 {
            return Err(CartError::InvalidInput(
                "Product id must be a positive value".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(CartError::InvalidInput(
                "Description cannot be empty".to_string(),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(CartError::InvalidInput(
                "Amount must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Snapshot of a cart as seen by a caller.
///
/// The store hands out copies; mutating a snapshot never affects the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart identifier, fixed at creation.
    pub id: CartId,
    /// Items in insertion order.
    pub items: Vec<Item>,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// Last successful read or mutation.
    pub last_accessed: DateTime<Utc>,
}

impl Cart {
    /// Look up an item by identifier.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of items in the cart.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
