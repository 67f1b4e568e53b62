//! HTTP API server for Cartkeep.
//!
//! Exposes a [`CartStore`](cartkeep_store::CartStore) over JSON:
//!
//! - `GET /health`
//! - `POST /api/carts`
//! - `GET /api/carts/{id}` and `DELETE /api/carts/{id}`
//! - `POST /api/carts/{id}/products`
//!
//! The server only borrows the store. Starting and stopping the sweeper
//! belongs to whoever constructed it.
//!
//! # Example
//!
//! ```ignore
//! use cartkeep_server::{AppState, Server, ServerConfig};
//! use cartkeep_store::{CartStore, StoreConfig, Sweeper};
//!
//! let store = CartStore::new(StoreConfig::default());
//! let sweeper = Sweeper::new(store.clone()).spawn();
//!
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:8080".parse()?);
//! Server::new(AppState::new(store, config))
//!     .run_until(tokio::signal::ctrl_c())
//!     .await?;
//!
//! sweeper.shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use logging::request_logging_middleware;
pub use routes::{CartResponse, DeleteCartResponse, HealthResponse};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Cartkeep HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .nest("/api", routes::cart_routes())
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until the process is killed.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the server until `shutdown` resolves, then drain in-flight
    /// requests and return.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future + Send + 'static,
    {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future + Send + 'static,
    {
        let router = self.router();
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Listener has no address: {}", e)))?;

        info!(%addr, "Starting server");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown signal received, draining connections");
            })
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use cartkeep_store::{CartStore, StoreConfig};
    use tower::ServiceExt;

    fn create_test_server() -> Server {
        let store = CartStore::new(StoreConfig::default());
        Server::new(AppState::new(store, ServerConfig::new()))
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let app = create_test_server().router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_routes_mounted_under_api() {
        let app = create_test_server().router();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/carts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/carts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::new()
            .with_bind_address("0.0.0.0:9000".parse().unwrap())
            .with_request_logging(false);

        assert_eq!(config.bind_address.port(), 9000);
        assert!(!config.request_logging);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_signal() {
        let server = create_test_server();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = server.serve(listener, async {}).await;

        assert!(result.is_ok());
    }
}
