//! Fixed-window request limiting per client IP.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;

use crate::{
    error::AppError,
    keyed_state::{Entry, StateStore},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub window_start: DateTime<Utc>,
    pub count: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn StateStore<Bucket>>,
    clock: Arc<dyn Clock>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn StateStore<Bucket>>,
        clock: Arc<dyn Clock>,
        limit: u32,
        window: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            limit,
            window,
        }
    }

    /// Counts one request for `key`; false once the window's budget is spent.
    pub fn check(&self, key: &str) -> bool {
        let now = self.clock.utc();
        let mut allowed = false;
        self.store.modify(key, now, &mut |current| {
            let bucket = match current {
                Some(b) if now < b.window_start + self.window => *b,
                _ => Bucket {
                    window_start: now,
                    count: 0,
                },
            };
            allowed = bucket.count < self.limit;
            let count = if allowed { bucket.count + 1 } else { bucket.count };
            Some(Entry {
                state: Bucket { count, ..bucket },
                expires_at: bucket.window_start + self.window,
            })
        });
        allowed
    }
}

pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn peer_addr(req: &Request) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

pub async fn limit_users(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(req.headers(), peer_addr(&req));
    if !state.user_limiter.check(&key) {
        tracing::debug!(client = %key, "user rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(req).await)
}

pub async fn limit_admins(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(req.headers(), peer_addr(&req));
    if !state.admin_limiter.check(&key) {
        tracing::debug!(client = %key, "admin rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keyed_state::MemoryStateStore, test_support::MutableClock};
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn limiter(limit: u32) -> (RateLimiter, Arc<MutableClock>) {
        let clock = Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let limiter = RateLimiter::new(
            Arc::new(MemoryStateStore::<Bucket>::new()),
            clock.clone(),
            limit,
            Duration::seconds(60),
        );
        (limiter, clock)
    }

    #[test]
    fn blocks_after_limit_within_window() {
        let (limiter, clock) = limiter(3);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        clock.advance(Duration::seconds(30));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"), "keys are independent");
    }

    #[test]
    fn new_window_resets_budget() {
        let (limiter, clock) = limiter(1);
        assert!(limiter.check("ip"));
        assert!(!limiter.check("ip"));
        clock.advance(Duration::seconds(59));
        assert!(!limiter.check("ip"));
        clock.advance(Duration::seconds(1));
        assert!(limiter.check("ip"));
    }

    #[test]
    fn client_key_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer)), "10.0.0.1");
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_key(&headers, Some(peer)), "9.9.9.9");
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }
}
