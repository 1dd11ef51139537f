//! Per-client token bucket rate limiting
//!
//! One `RateLimiter` is owned by the server and shared with the middleware
//! through router state. Buckets live in a single mutex-guarded map; every
//! lock is taken and released inside one method call. A reaper task drops
//! clients that have been idle longer than `idle_ttl`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::task::JoinHandle;

use crate::http::ApiError;

/// Rate limiter settings
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterConfig {
    /// Disable to skip the middleware entirely
    pub enabled: bool,

    /// Sustained requests per second per client
    pub requests_per_second: f64,

    /// Bucket capacity (max requests in a burst)
    pub burst: u32,

    /// Clients idle longer than this are forgotten
    pub idle_ttl: Duration,

    /// How often the reaper runs
    pub sweep_interval: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst: 4,
            idle_ttl: Duration::from_secs(3 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

/// Token buckets keyed by client identifier
#[derive(Debug)]
pub struct RateLimiter {
    config: LimiterConfig,
    clients: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `client`, returning false when its bucket is empty.
    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    fn allow_at(&self, client: &str, now: Instant) -> bool {
        let capacity = self.config.burst as f64;
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        let bucket = clients.entry(client.to_owned()).or_insert(Bucket {
            tokens: capacity,
            last_seen: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_seen).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.requests_per_second).min(capacity);
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop clients not seen for longer than `idle_ttl`. Returns how many.
    pub fn reap_idle(&self) -> usize {
        self.reap_idle_at(Instant::now())
    }

    fn reap_idle_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let before = clients.len();
        clients.retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) <= self.config.idle_ttl);
        before - clients.len()
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Spawn the periodic reaper.
    ///
    /// The task only holds a weak reference and exits once the limiter has
    /// been dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                let removed = limiter.reap_idle();
                if removed > 0 {
                    tracing::debug!(removed, "reaped idle rate limit clients");
                }
            }
        })
    }
}

/// Client key for a request: the peer IP when known.
fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Middleware rejecting requests from clients whose bucket is empty
pub async fn limit_by_client(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);

    if !limiter.allow(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }

    next.run(req).await
}
