//! Per-client token-bucket rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
    max_clients: usize,
}

impl RateLimiter {
    pub fn new(capacity: f64, refill_per_sec: f64, max_clients: usize) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: capacity.max(1.0),
            refill_per_sec: refill_per_sec.max(0.0),
            max_clients: max_clients.max(1),
        }
    }

    pub async fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut lock = self.buckets.lock().await;
        if !lock.contains_key(key) && lock.len() >= self.max_clients {
            self.prune(&mut lock, now);
        }
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets that have refilled completely; a fresh bucket would be
    /// identical. If that frees nothing, drop the least recently seen.
    fn prune(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        let before = buckets.len();
        buckets.retain(|_, b| {
            let idle = now.saturating_duration_since(b.last_refill).as_secs_f64();
            b.tokens + idle * self.refill_per_sec < self.capacity
        });
        if buckets.len() >= self.max_clients
            && let Some(oldest) = buckets
                .iter()
                .min_by_key(|(_, b)| b.last_refill)
                .map(|(k, _)| k.clone())
        {
            buckets.remove(&oldest);
        }
        debug!(dropped = before - buckets.len(), kept = buckets.len(), "rate limit buckets pruned");
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Client key: the peer address, or the first `X-Forwarded-For` hop when the
/// header comes from a trusted proxy.
fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for
        && let Some(forwarded) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req, state.config.trust_forwarded_for);
    if !state.limiter.allow(&key).await {
        warn!(client = %key, path = %req.uri().path(), "rate limited");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}
