//! Fixed-window rate limiting per client identifier.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::Client as RedisClient;
use tokio::time::Instant;

use crate::errors::AppError;

const KEY_PREFIX: &str = "advisor:rate:";

/// Carried in `AppState` as `Arc<dyn RateLimiter>`.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one request for `identifier`. Returns false once the window is exhausted.
    async fn check(&self, identifier: &str) -> Result<bool, AppError>;
}

/// Fixed window on a per-identifier key.
///
/// `SET key 0 EX window NX` and `INCR key` run in one MULTI/EXEC, so a key can
/// never exist without its expiry.
#[derive(Clone)]
pub struct RedisRateLimiter {
    client: RedisClient,
    max_requests: u32,
    window: Duration,
}

impl RedisRateLimiter {
    pub fn new(client: RedisClient, max_requests: u32, window: Duration) -> Self {
        Self {
            client,
            max_requests,
            window,
        }
    }
}

fn window_pipeline(key: &str, window: Duration) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("EX")
        .arg(window.as_secs().max(1))
        .arg("NX")
        .ignore()
        .cmd("INCR")
        .arg(key);
    pipe
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, identifier: &str) -> Result<bool, AppError> {
        let key = format!("{KEY_PREFIX}{identifier}");
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        let (count,): (u64,) = window_pipeline(&key, self.window)
            .query_async(&mut conn)
            .await
            .context("Redis rate window update failed")?;

        Ok(count <= u64::from(self.max_requests))
    }
}

/// Process-local limiter with the same semantics as the Redis one.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    counters: Mutex<HashMap<String, (Instant, u32)>>,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, identifier: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.retain(|_, (started, _)| now.duration_since(*started) < self.window);

        let (_, count) = counters
            .entry(identifier.to_string())
            .or_insert((now, 0));

        if *count >= self.max_requests {
            return Ok(false);
        }
        *count += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_blocks_after_max_requests() {
        let limiter = InMemoryRateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").await.unwrap());
        }
        assert!(!limiter.check("1.2.3.4").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identifiers_are_independent() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").await.unwrap());
        assert!(!limiter.check("a").await.unwrap());
        assert!(limiter.check("b").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = InMemoryRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").await.unwrap());
        assert!(!limiter.check("a").await.unwrap());
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.check("a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_windows_are_pruned() {
        let limiter = InMemoryRateLimiter::new(5, Duration::from_secs(60));
        for id in ["a", "b", "c"] {
            limiter.check(id).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.check("d").await.unwrap();

        let counters = limiter.counters.lock().unwrap();
        assert_eq!(counters.len(), 1);
        assert!(counters.contains_key("d"));
    }

    #[test]
    fn test_window_pipeline_sets_expiry_and_increments_atomically() {
        let packed = window_pipeline("advisor:rate:1.2.3.4", Duration::from_secs(60))
            .get_packed_pipeline();
        let text = String::from_utf8(packed).unwrap();

        let position = |needle: &str| text.find(needle).unwrap();
        assert!(position("MULTI") < position("SET"));
        assert!(position("SET") < position("INCR"));
        assert!(position("INCR") < position("EXEC"));
        assert!(text.contains("\r\nNX\r\n"));
        assert!(text.contains("\r\nEX\r\n"));
        assert!(text.contains("\r\n60\r\n"));
    }
}
