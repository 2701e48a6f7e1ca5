//! Fixed-window request limiting per client IP.

use super::{error::AppError, AppState};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const RATE_LIMIT_REMAINING_HEADER: &str = "ratelimit-remaining";

/// Client address resolved by the limiter, available to handlers behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now()).await
    }

    /// Count one request for `key` at `now`. The window starts with the first
    /// request and resets once it has fully elapsed.
    pub async fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock().await;
        windows.retain(|_, window| now.saturating_duration_since(window.started) < self.window);

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if window.count >= self.max_requests {
            return RateDecision {
                allowed: false,
                remaining: 0,
            };
        }

        window.count += 1;
        RateDecision {
            allowed: true,
            remaining: self.max_requests - window.count,
        }
    }
}

/// Socket peer address. With `trust_proxy`, the first `X-Forwarded-For`
/// entry takes precedence; without it the header is ignored, since any
/// client can set it.
pub fn client_ip(request: &Request, trust_proxy: bool) -> Option<String> {
    let forwarded = trust_proxy
        .then(|| {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .flatten();

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

pub async fn rate_limit(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let ip = client_ip(&request, state.config.trust_proxy);
    let key = ip.clone().unwrap_or_else(|| "unknown".to_string());

    let decision = state.limiter.check(&key).await;
    if !decision.allowed {
        warn!("Rate limit exceeded for {}", key);
        return AppError::RateLimited.into_response();
    }
    debug!("{} requests left for {}", decision.remaining, key);

    if let Some(ip) = ip {
        request.extensions_mut().insert(ClientIp(ip));
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        RATE_LIMIT_REMAINING_HEADER,
        HeaderValue::from(decision.remaining),
    );
    response
}
