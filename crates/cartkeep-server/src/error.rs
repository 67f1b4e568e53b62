//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cartkeep_store::CartError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CartError> for ServerError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::NotFound(_) => ServerError::NotFound(e.to_string()),
            CartError::DuplicateItem { .. } => ServerError::BadRequest(e.to_string()),
            CartError::InvalidInput(reason) => ServerError::BadRequest(reason),
        }
    }
}

impl ServerError {
    /// The client-facing message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ServerError::NotFound(msg) | ServerError::BadRequest(msg) => msg,
            ServerError::Internal(_) => "Internal server error",
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Server error");
        } else {
            tracing::warn!(status = %status, error = %self, "Client error");
        }

        let body = ErrorResponse {
            error: self.message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartkeep_store::{CartId, ItemId};

    #[test]
    fn test_cart_error_mapping() {
        let id = CartId::new();

        let err = ServerError::from(CartError::NotFound(id));
        assert!(matches!(err, ServerError::NotFound(_)));
        assert_eq!(err.message(), format!("Cart with id {id} does not exist"));

        let err = ServerError::from(CartError::DuplicateItem {
            cart_id: id,
            item_id: ItemId::new(1),
        });
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert_eq!(err.message(), "Product with id 1 is already in the cart");

        let err = ServerError::from(CartError::InvalidInput("Description cannot be empty".into()));
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert_eq!(err.message(), "Description cannot be empty");
    }

    async fn body_of(err: ServerError) -> ErrorResponse {
        let body = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_body_carries_bare_message() {
        let body = body_of(ServerError::NotFound("Cart with id 42 does not exist".into())).await;
        assert_eq!(body.error, "Cart with id 42 does not exist");

        let body = body_of(ServerError::BadRequest("Invalid cart ID: nope".into())).await;
        assert_eq!(body.error, "Invalid cart ID: nope");
    }

    #[tokio::test]
    async fn test_internal_detail_stays_in_logs() {
        let err = ServerError::Internal("pool poisoned".into());
        assert_eq!(err.to_string(), "Internal error: pool poisoned");

        let body = body_of(err).await;
        assert_eq!(body.error, "Internal server error");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ServerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServerError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ServerError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
