//! HTTP server command for the comments API

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use quill_core::{CommentStore, MemoryCommentStore};
use quill_server::db::ensure_schema;
use quill_server::{
    create_pool, run_server, DatabaseConfig, LimiterConfig, PgCommentStore, ServerConfig,
};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', env = "QUILL_BIND", default_value = "0.0.0.0:8081")]
    pub bind: SocketAddr,

    /// Environment (development|staging|production)
    #[arg(
        long = "env",
        env = "QUILL_ENV",
        default_value = "development",
        value_parser = ["development", "staging", "production"]
    )]
    pub environment: String,

    /// PostgreSQL DSN
    #[arg(long, alias = "db-dsn", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long, env = "QUILL_DB_MAX_CONNECTIONS", default_value_t = 25)]
    pub db_max_connections: u32,

    /// Deadline for each database call, in seconds
    #[arg(long, env = "QUILL_STORE_TIMEOUT_SECS", default_value_t = 3)]
    pub store_timeout_secs: u64,

    /// Trusted CORS origins (space separated)
    #[arg(
        long,
        env = "QUILL_CORS_TRUSTED_ORIGINS",
        default_value = "http://localhost:8080"
    )]
    pub cors_trusted_origins: String,

    /// Enable per-client rate limiting
    #[arg(long, env = "QUILL_LIMITER_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub limiter_enabled: bool,

    /// Rate limiter sustained requests per second
    #[arg(long, env = "QUILL_LIMITER_RPS", default_value_t = 2.0)]
    pub limiter_rps: f64,

    /// Rate limiter burst size
    #[arg(long, env = "QUILL_LIMITER_BURST", default_value_t = 4)]
    pub limiter_burst: u32,

    /// Keep comments in memory instead of Postgres (nothing persists)
    #[arg(long)]
    pub in_memory: bool,
}

impl ServeArgs {
    fn server_config(&self) -> Result<ServerConfig> {
        if self.limiter_rps <= 0.0 || !self.limiter_rps.is_finite() {
            bail!("--limiter-rps must be a positive number");
        }
        if self.limiter_burst == 0 {
            bail!("--limiter-burst must be at least 1");
        }

        Ok(ServerConfig {
            bind_addr: self.bind,
            environment: self.environment.clone(),
            trusted_origins: self
                .cors_trusted_origins
                .split_whitespace()
                .map(str::to_owned)
                .collect(),
            limiter: LimiterConfig {
                enabled: self.limiter_enabled,
                requests_per_second: self.limiter_rps,
                burst: self.limiter_burst,
                ..LimiterConfig::default()
            },
        })
    }

    fn database_config(&self, url: String) -> Result<DatabaseConfig> {
        if self.store_timeout_secs == 0 {
            bail!("--store-timeout-secs must be at least 1");
        }
        if self.db_max_connections == 0 {
            bail!("--db-max-connections must be at least 1");
        }

        Ok(DatabaseConfig {
            max_connections: self.db_max_connections,
            store_deadline: Duration::from_secs(self.store_timeout_secs),
            ..DatabaseConfig::new(url)
        })
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = args.server_config()?;

    let store: Arc<dyn CommentStore> = if args.in_memory {
        tracing::warn!("Using in-memory store; comments are lost on shutdown");
        Arc::new(MemoryCommentStore::new())
    } else {
        let url = args
            .database_url
            .clone()
            .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or .env")?;
        let db = args.database_config(url)?;

        let pool = create_pool(&db)
            .await
            .context("Failed to create database pool")?;
        tracing::info!("database connection pool established");

        ensure_schema(&pool)
            .await
            .context("Failed to prepare comments table")?;

        Arc::new(
            PgCommentStore::new(pool)
                .with_deadline(db.store_deadline)
                .with_acquire_timeout(db.connect_timeout),
        )
    };

    run_server(store, config).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServeArgs {
        let argv = std::iter::once("serve").chain(args.iter().copied());
        ServeArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn splits_trusted_origins() {
        let args = parse(&["--cors-trusted-origins", "http://a.test  http://b.test"]);
        let config = args.server_config().unwrap();
        assert_eq!(config.trusted_origins, ["http://a.test", "http://b.test"]);
    }

    #[test]
    fn limiter_flags() {
        let args = parse(&["--limiter-enabled", "false", "--limiter-burst", "9"]);
        let config = args.server_config().unwrap();
        assert!(!config.limiter.enabled);
        assert_eq!(config.limiter.burst, 9);

        let args = parse(&["--limiter-rps", "0"]);
        assert!(args.server_config().is_err());
    }

    #[test]
    fn rejects_unknown_environment() {
        let argv = ["serve", "--env", "qa"];
        assert!(ServeArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn database_settings() {
        let args = parse(&["--store-timeout-secs", "5", "--db-max-connections", "4"]);
        let db = args
            .database_config("postgres://localhost/quill".into())
            .unwrap();
        assert_eq!(db.store_deadline, Duration::from_secs(5));
        assert_eq!(db.max_connections, 4);
    }

    #[test]
    fn rejects_zero_store_timeout() {
        let args = parse(&["--store-timeout-secs", "0"]);
        let err = args
            .database_config("postgres://localhost/quill".into())
            .unwrap_err();
        assert!(err.to_string().contains("--store-timeout-secs"));
    }
}
