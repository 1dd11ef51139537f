//! quill-server: comment CRUD over HTTP
//!
//! Exposes the `quill-core` record store as a small JSON API, with a
//! Postgres-backed `CommentStore` and a per-client rate limiter.

pub mod db;
pub mod http;
pub mod ratelimit;

pub use db::{create_pool, DatabaseConfig, PgCommentStore};
pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
pub use ratelimit::{LimiterConfig, RateLimiter};
