//! webapp: a liveness/readiness service backed by Postgres.
//!
//! Exposes `GET /healthz`, which answers 200 only after a successful write to
//! `webapp.health_checks`. The binary in `main.rs` wires configuration, the
//! database pool and the HTTP server together; the pieces live here so they can
//! be driven directly from tests.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use db::{Database, DatabaseError, HealthStore};
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
