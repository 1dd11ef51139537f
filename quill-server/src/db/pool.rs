//! Database connection pool management
//!
//! Uses sqlx PgPool with explicit connection limits and acquire timeout.

use std::time::Duration;

use quill_core::DEFAULT_DEADLINE;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Default maximum connections for the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 25;

/// How long startup waits for the first connection.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Database settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// How long to wait for a free connection (startup and per call)
    pub connect_timeout: Duration,

    /// Deadline for each store call
    pub store_deadline: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            store_deadline: DEFAULT_DEADLINE,
        }
    }
}

/// Create a PostgreSQL connection pool.
///
/// Connects eagerly, so a bad DSN or unreachable server fails here rather
/// than on the first request.
///
/// # Errors
///
/// Returns an error if no connection can be established within
/// `connect_timeout`.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&DatabaseConfig::new("postgres://localhost/quill")).await?;
/// ```
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p quill-server -- --ignored

    #[test]
    fn defaults() {
        let config = DatabaseConfig::new("postgres://localhost/quill");
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.store_deadline, Duration::from_secs(3));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&DatabaseConfig::new(url))
            .await
            .expect("pool creation failed");

        let result: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");

        assert_eq!(result.0, 1);
    }
}
