//! HTTP server layer
//!
//! Axum server with:
//! - CORS limited to trusted origins
//! - Request tracing
//! - Per-client rate limiting
//! - Panic recovery into JSON 500s
//! - Graceful shutdown
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
