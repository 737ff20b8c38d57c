//! HTTP server module.
//!
//! Serves the router over plain HTTP and drains in-flight requests on
//! SIGTERM/SIGINT before returning control to `main`, which then releases the
//! database pool.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
