//! Axum server setup
//!
//! Server skeleton with:
//! - CORS restricted to configured trusted origins
//! - Tracing middleware
//! - Rate limiting middleware (optional)
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use quill_core::CommentStore;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::routes;
use crate::ratelimit::{self, LimiterConfig, RateLimiter};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8081)
    pub bind_addr: SocketAddr,

    /// Deployment environment reported by the healthcheck
    pub environment: String,

    /// Origins allowed to make cross-origin requests
    pub trusted_origins: Vec<String>,

    /// Per-client rate limiting
    pub limiter: LimiterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            environment: "development".to_string(),
            trusted_origins: vec!["http://localhost:8080".to_string()],
            limiter: LimiterConfig::default(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CommentStore>,
    pub environment: String,
}

impl AppState {
    pub fn new(store: Arc<dyn CommentStore>, environment: impl Into<String>) -> Self {
        Self {
            store,
            environment: environment.into(),
        }
    }
}

fn cors_layer(trusted_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = trusted_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::OPTIONS,
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };

    ApiError::Internal { message }.into_response()
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Build the application router with all routes.
///
/// The limiter is owned by the caller; pass `None` to disable rate limiting.
pub fn build_router(
    state: AppState,
    config: &ServerConfig,
    limiter: Option<Arc<RateLimiter>>,
) -> Router {
    let mut router = Router::new()
        .merge(routes::health::router())
        .merge(routes::comments::router())
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed);

    if let Some(limiter) = limiter {
        router = router.layer(middleware::from_fn_with_state(
            limiter,
            ratelimit::limit_by_client,
        ));
    }

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&config.trusted_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&DatabaseConfig::new(database_url)).await?;
/// let store = Arc::new(PgCommentStore::new(pool));
/// run_server(store, ServerConfig::default()).await?;
/// ```
pub async fn run_server(
    store: Arc<dyn CommentStore>,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let state = AppState::new(store, config.environment.clone());

    let limiter = if config.limiter.enabled {
        Some(Arc::new(RateLimiter::new(config.limiter.clone())))
    } else {
        tracing::warn!("Rate limiting disabled");
        None
    };
    let reaper = limiter.as_ref().map(RateLimiter::spawn_reaper);

    let app = build_router(state, &config, limiter);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        env = %config.environment,
        "Server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(reaper) = reaper {
        reaper.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use quill_core::MemoryCommentStore;
    use tower::ServiceExt;

    fn app(limiter: Option<Arc<RateLimiter>>) -> Router {
        let state = AppState::new(Arc::new(MemoryCommentStore::new()), "test");
        build_router(state, &ServerConfig::default(), limiter)
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.environment, "development");
        assert!(config.limiter.enabled);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = app(None)
            .oneshot(Request::get("/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let response = app(None)
            .oneshot(
                Request::put("/v1/healthcheck")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn trusted_origin_gets_cors_headers() {
        let response = app(None)
            .oneshot(
                Request::get("/v1/healthcheck")
                    .header(header::ORIGIN, "http://localhost:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:8080"
        );

        let response = app(None)
            .oneshot(
                Request::get("/v1/healthcheck")
                    .header(header::ORIGIN, "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn rate_limit_applies_per_peer() {
        let limiter = Arc::new(RateLimiter::new(LimiterConfig {
            requests_per_second: 0.001,
            burst: 1,
            ..LimiterConfig::default()
        }));
        let app = app(Some(limiter));

        let request = |ip: [u8; 4]| {
            let mut req = Request::get("/v1/healthcheck")
                .body(Body::empty())
                .unwrap();
            req.extensions_mut()
                .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
            req
        };

        let first = app.clone().oneshot(request([10, 0, 0, 1])).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(request([10, 0, 0, 1])).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(request([10, 0, 0, 2])).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }
}
