//! HTTP route handlers.
//!
//! The service exposes a single route. Every method is routed to the health
//! handler so its own ordered checks produce the 405; other paths fall through
//! to axum's default 404.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;

use axum::{middleware, routing::any, Router};

use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Path polled by load balancers and orchestrators
pub const HEALTH_PATH: &str = "/healthz";

/// Creates the Axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, any(health::healthz))
        .with_state(state)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
