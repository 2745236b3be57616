use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Fixed-window request counter per client IP.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    pub fn check_rate_limit(&self, client_ip: &str) -> bool {
        let mut clients = self.clients.lock().unwrap();
        let now = Instant::now();

        match clients.get_mut(client_ip) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) > self.window_duration {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                clients.insert(client_ip.to_string(), (1, now));
                true
            }
        }
    }

    pub fn cleanup_expired(&self) {
        let mut clients = self.clients.lock().unwrap();
        let now = Instant::now();
        clients.retain(|_, (_, window_start)| {
            now.duration_since(*window_start) <= self.window_duration
        });
    }
}

fn too_many_requests() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Rate limit exceeded. Please try again later.",
            "retry_after": 60
        })),
    )
}

/// General limiter: 100 requests per minute per IP.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    static RATE_LIMITER: std::sync::OnceLock<RateLimiter> = std::sync::OnceLock::new();
    let rate_limiter = RATE_LIMITER.get_or_init(|| RateLimiter::new(100, 60));

    let client_ip = addr.ip().to_string();
    if !rate_limiter.check_rate_limit(&client_ip) {
        tracing::warn!("Rate limit exceeded for IP: {}", client_ip);
        return Err(too_many_requests());
    }

    if rand::random::<u8>() < 10 {
        rate_limiter.cleanup_expired();
    }

    Ok(next.run(request).await)
}

/// Stricter limiter for credential endpoints: 10 requests per minute per IP.
pub async fn strict_rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    static STRICT_RATE_LIMITER: std::sync::OnceLock<RateLimiter> = std::sync::OnceLock::new();
    let rate_limiter = STRICT_RATE_LIMITER.get_or_init(|| RateLimiter::new(10, 60));

    let client_ip = addr.ip().to_string();
    if !rate_limiter.check_rate_limit(&client_ip) {
        tracing::warn!("Strict rate limit exceeded for IP: {}", client_ip);
        return Err(too_many_requests());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_blocks_after_max_requests_in_window() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(!limiter.check_rate_limit("10.0.0.1"));
        // Another client is unaffected.
        assert!(limiter.check_rate_limit("10.0.0.2"));
    }
}
