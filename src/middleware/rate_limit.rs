// src/middleware/rate_limit.rs
//
// In-memory fixed-window limiter for the public lead-submission endpoint.
// Keyed by client IP; the internal CRM routes are not limited.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::{common::error::AppError, config::AppState};

#[derive(Clone)]
struct Bucket {
    count: u32,
    reset_at: Instant,
}

impl Bucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    /// Returns Ok on admission, Err(seconds until the window resets) when
    /// the limit is hit.
    fn check_and_increment(&mut self, limit: u32, window: Duration) -> Result<(), u64> {
        let now = Instant::now();
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            Ok(())
        } else {
            Err(self.reset_at.saturating_duration_since(now).as_secs().max(1))
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    pub async fn check(&self, key: &str) -> Result<(), AppError> {
        let mut buckets = self.buckets.lock().await;

        // Opportunistic cleanup before the map grows unbounded.
        if buckets.len() > 10_000 {
            let now = Instant::now();
            buckets.retain(|_, bucket| bucket.reset_at > now);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(self.window));

        bucket
            .check_and_increment(self.limit, self.window)
            .map_err(|retry_after_secs| AppError::RateLimited { retry_after_secs })
    }
}

pub async fn rate_limit_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_ip(&request);
    app_state.rate_limiter.check(&key).await?;
    Ok(next.run(request).await)
}

/// Best-effort client identity: first hop of X-Forwarded-For, then
/// X-Real-IP. Behind the expected reverse proxy one of the two is set.
fn client_ip(request: &Request) -> String {
    let headers = request.headers();

    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").await.is_ok());
        }
        let err = limiter.check("1.2.3.4").await.unwrap_err();
        match err {
            AppError::RateLimited { retry_after_secs } => assert!(retry_after_secs >= 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("1.1.1.1").await.is_ok());
        assert!(limiter.check("2.2.2.2").await.is_ok());
        assert!(limiter.check("1.1.1.1").await.is_err());
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("1.2.3.4").await.is_ok());
        assert!(limiter.check("1.2.3.4").await.is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("1.2.3.4").await.is_ok());
    }
}
