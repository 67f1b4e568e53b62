//! Concurrent in-memory cart store with idle eviction.
//!
//! This crate is the core of Cartkeep:
//! - [`CartStore`] keeps every live cart, sharded so that operations on
//!   different carts never contend on one global lock
//! - [`Sweeper`] periodically evicts carts that have been idle longer than
//!   the configured timeout, re-validating each cart under its own guard
//!   before removing it
//!
//! # Example
//!
//! ```rust,ignore
//! use cartkeep_store::{CartStore, Item, StoreConfig, Sweeper};
//!
//! let config = StoreConfig::default()
//!     .with_idle_timeout(Duration::from_secs(600))
//!     .with_sweep_interval(Duration::from_secs(60));
//!
//! let store = CartStore::new(config);
//! let sweeper = Sweeper::new(store.clone()).spawn();
//!
//! let cart = store.create();
//! store.add_item(cart.id, Item::new(1, "Widget", Decimal::new(999, 2)))?;
//!
//! sweeper.shutdown().await;
//! ```

mod clock;
mod config;
mod error;
mod model;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, StoreConfig};
pub use error::{CartError, EvictionError, Result};
pub use model::{Cart, CartId, Item, ItemId};
pub use store::{CartStore, StoreStats};
pub use sweeper::{EvictionListener, NoopListener, SweepReport, Sweeper, SweeperHandle};

pub use rust_decimal::Decimal;
