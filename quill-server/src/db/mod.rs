//! Database layer - connection pool, schema bootstrap and the Postgres store
//!
//! # Design Principles
//!
//! - Connection pool with explicit limits - no Arc<Mutex<Connection>>
//! - Conditional writes instead of check-then-update
//! - Listing uses `count(*) OVER()` - no separate COUNT round trip
//! - ORDER BY comes from a fixed allow-list, never from request text

pub mod comments;
pub mod pool;
pub mod schema;

pub use comments::PgCommentStore;
pub use pool::{create_pool, DatabaseConfig};
pub use schema::ensure_schema;
