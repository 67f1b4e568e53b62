//! API routes.

pub mod carts;
pub mod health;

pub use carts::{
    CartResponse, DeleteCartResponse, add_item_handler, cart_routes, create_cart_handler,
    delete_cart_handler, get_cart_handler,
};
pub use health::{HealthResponse, health_routes};
