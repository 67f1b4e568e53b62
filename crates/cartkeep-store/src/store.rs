//! The concurrent cart store.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{CartError, Result};
use crate::model::{Cart, CartId, Item};

/// Stored state of one cart.
#[derive(Debug)]
struct CartEntry {
    items: Vec<Item>,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

impl CartEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            created_at: now,
            last_accessed: now,
        }
    }

    /// Refresh recency. Never moves the timestamp backwards.
    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
    }

    fn is_idle(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_accessed < cutoff
    }

    fn snapshot(&self, id: CartId) -> Cart {
        Cart {
            id,
            items: self.items.clone(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }

    fn into_cart(self, id: CartId) -> Cart {
        Cart {
            id,
            items: self.items,
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }
}

/// Thread-safe keeper of all live carts.
///
/// The map is sharded, so carts in different shards never block each other,
/// and every operation on a single cart runs under that cart's shard guard.
/// That guard is what makes per-cart operations linearizable, including the
/// sweeper's re-validation in [`evict_if_idle`](Self::evict_if_idle).
///
/// Cloning is cheap; clones share the same carts.
#[derive(Debug, Clone)]
pub struct CartStore {
    carts: Arc<DashMap<CartId, CartEntry>>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl CartStore {
    /// Create a store that uses the system clock.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create a store with a custom time source.
    pub fn with_clock(config: StoreConfig, clock: impl Clock + 'static) -> Self {
        Self {
            carts: Arc::new(DashMap::new()),
            clock: Arc::new(clock),
            config,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the store's time source.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Create an empty cart with a fresh identifier.
    pub fn create(&self) -> Cart {
        let now = self.clock.now();
        loop {
            let id = CartId::new();
            if let Entry::Vacant(slot) = self.carts.entry(id) {
                let entry = slot.insert(CartEntry::new(now));
                let cart = entry.snapshot(id);
                drop(entry);
                info!(cart_id = %id, "Cart created");
                return cart;
            }
        }
    }

    /// Get a cart, refreshing its last access time.
    pub fn get(&self, id: CartId) -> Result<Cart> {
        let mut entry = self.carts.get_mut(&id).ok_or(CartError::NotFound(id))?;
        entry.touch(self.clock.now());
        let cart = entry.snapshot(id);
        drop(entry);

        info!(cart_id = %id, "Cart retrieved");
        Ok(cart)
    }

    /// Append an item to a cart.
    ///
    /// Fails with [`CartError::InvalidInput`] for a malformed item,
    /// [`CartError::NotFound`] for an unknown cart, and
    /// [`CartError::DuplicateItem`] if the cart already holds an item with
    /// the same id. A rejected item leaves the cart untouched, including its
    /// last access time. Returns the stored item unchanged.
    pub fn add_item(&self, cart_id: CartId, item: Item) -> Result<Item> {
        item.validate()?;

        let mut entry = self
            .carts
            .get_mut(&cart_id)
            .ok_or(CartError::NotFound(cart_id))?;

        if entry.items.iter().any(|existing| existing.id == item.id) {
            return Err(CartError::DuplicateItem {
                cart_id,
                item_id: item.id,
            });
        }

        entry.items.push(item.clone());
        entry.touch(self.clock.now());
        drop(entry);

        info!(cart_id = %cart_id, item_id = %item.id, "Item added to cart");
        Ok(item)
    }

    /// Remove a cart. A second delete of the same id fails with
    /// [`CartError::NotFound`].
    pub fn delete(&self, id: CartId) -> Result<()> {
        match self.carts.remove(&id) {
            Some(_) => {
                info!(cart_id = %id, "Cart deleted");
                Ok(())
            }
            None => Err(CartError::NotFound(id)),
        }
    }

    /// Check whether a cart is live, without refreshing it.
    pub fn contains(&self, id: CartId) -> bool {
        self.carts.contains_key(&id)
    }

    /// Look at a cart without refreshing its last access time.
    pub fn peek(&self, id: CartId) -> Option<Cart> {
        self.carts.get(&id).map(|entry| entry.snapshot(id))
    }

    /// Number of live carts.
    pub fn len(&self) -> usize {
        self.carts.len()
    }

    /// Check if the store holds no carts.
    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let (carts, items) = self
            .carts
            .iter()
            .fold((0, 0), |(carts, items), entry| (carts + 1, items + entry.items.len()));
        StoreStats { carts, items }
    }

    /// Carts whose last access is strictly older than `now - idle_timeout`.
    ///
    /// This is a point-in-time snapshot; callers must re-validate each id with
    /// [`evict_if_idle`](Self::evict_if_idle) before acting on it.
    pub fn idle_candidates(&self, now: DateTime<Utc>) -> Vec<CartId> {
        let Some(cutoff) = self.idle_cutoff(now) else {
            return Vec::new();
        };

        self.carts
            .iter()
            .filter(|entry| entry.is_idle(cutoff))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Remove a cart only if it is still idle as of `now`.
    ///
    /// The staleness check and the removal happen under the cart's guard, so
    /// a cart refreshed by a concurrent `get` or `add_item` survives. Returns
    /// the evicted cart, or `None` if it was refreshed or is already gone.
    pub fn evict_if_idle(&self, id: CartId, now: DateTime<Utc>) -> Option<Cart> {
        let cutoff = self.idle_cutoff(now)?;

        match self.carts.remove_if(&id, |_, entry| entry.is_idle(cutoff)) {
            Some((id, entry)) => Some(entry.into_cart(id)),
            None => {
                trace!(cart_id = %id, "Cart no longer idle or already removed");
                None
            }
        }
    }

    /// Oldest last-access time that still counts as active, or `None` when
    /// the timeout reaches past the start of representable time.
    fn idle_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let timeout = match TimeDelta::from_std(self.config.idle_timeout) {
            Ok(timeout) => timeout,
            Err(_) => {
                debug!(timeout = ?self.config.idle_timeout, "Idle timeout out of range, nothing expires");
                return None;
            }
        };
        now.checked_sub_signed(timeout)
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of live carts.
    pub carts: usize,

    /// Total items across all live carts.
    pub items: usize,
}
