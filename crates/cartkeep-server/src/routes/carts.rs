//! Cart endpoints.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use cartkeep_store::{Cart, CartError, CartId, Item};

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Cart representation returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    /// Cart ID.
    pub id: String,
    /// Items in insertion order.
    pub products: Vec<Item>,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last access time (RFC 3339).
    pub last_accessed: String,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            id: cart.id.to_string(),
            products: cart.items,
            created_at: cart.created_at.to_rfc3339(),
            last_accessed: cart.last_accessed.to_rfc3339(),
        }
    }
}

/// Confirmation returned by a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCartResponse {
    /// Human-readable confirmation naming the cart.
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/carts - Create an empty cart.
pub async fn create_cart_handler(State(state): State<AppState>) -> Json<CartResponse> {
    Json(state.store.create().into())
}

/// GET /api/carts/{id} - Get a cart, refreshing its idle timer.
pub async fn get_cart_handler(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartResponse>, ServerError> {
    let id = parse_cart_id(&cart_id)?;
    let cart = state.store.get(id)?;
    Ok(Json(cart.into()))
}

/// POST /api/carts/{id}/products - Add an item to a cart.
///
/// Malformed items are rejected here and never reach the store.
pub async fn add_item_handler(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    payload: Result<Json<Item>, JsonRejection>,
) -> Result<Json<Item>, ServerError> {
    let id = parse_cart_id(&cart_id)?;
    let Json(item) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    item.validate()?;

    let stored = state.store.add_item(id, item).map_err(|e| match e {
        CartError::NotFound(id) => ServerError::NotFound(format!(
            "Cannot add product. Cart with id {} does not exist",
            id
        )),
        other => other.into(),
    })?;
    Ok(Json(stored))
}

/// DELETE /api/carts/{id} - Remove a cart.
pub async fn delete_cart_handler(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> Result<Json<DeleteCartResponse>, ServerError> {
    let id = parse_cart_id(&cart_id)?;
    state.store.delete(id).map_err(|e| match e {
        CartError::NotFound(id) => ServerError::NotFound(format!(
            "Cannot be deleted. The cart with id {} does not exist",
            id
        )),
        other => other.into(),
    })?;

    Ok(Json(DeleteCartResponse {
        message: format!("Cart with id {} has been successfully removed.", id),
    }))
}

/// Create cart routes, relative to the API prefix.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/carts", post(create_cart_handler))
        .route(
            "/carts/{id}",
            get(get_cart_handler).delete(delete_cart_handler),
        )
        .route("/carts/{id}/products", post(add_item_handler))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_cart_id(s: &str) -> Result<CartId, ServerError> {
    uuid::Uuid::parse_str(s)
        .map(CartId::from_uuid)
        .map_err(|_| ServerError::BadRequest(format!("Invalid cart ID: {}", s)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
