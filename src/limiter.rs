// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-source rate limiting for the inbound endpoint.
//!
//! Every accepted request costs a server-side fetch of an
//! attacker-supplied URL, so a sender hammering the endpoint with one
//! source URL amplifies into outbound traffic. The limiter holds a token
//! bucket per normalized source URL. Off by default to match the
//! reference behavior; enable it for anything internet-facing.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until a slot frees up
        retry_after: Duration,
    },
}

/// Token bucket for one source URL.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_rate_per_minute: u32) -> Self {
        let max_tokens = max_rate_per_minute as f64;
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate: max_tokens / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn remaining(&self) -> u32 {
        self.tokens.floor() as u32
    }

    fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Thread-safe per-source rate limiter.
pub struct SourceRateLimiter {
    config: RateLimitConfig,
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
}

impl SourceRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check rate limit for a source URL. Always allows when disabled.
    pub async fn check(&self, source_url: &str) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed {
                remaining: self.config.max_rate_per_source,
            };
        }

        let normalized = normalize_source_url(source_url);

        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(normalized.clone())
            .or_insert_with(|| TokenBucket::new(self.config.max_rate_per_source));

        if bucket.try_consume() {
            RateLimitResult::Allowed {
                remaining: bucket.remaining(),
            }
        } else {
            let retry_after = bucket.time_until_available();
            debug!(source = %normalized, ?retry_after, "Source rate limit exceeded");
            RateLimitResult::Limited { retry_after }
        }
    }

    /// Drop buckets idle for longer than the stale threshold.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let stale_threshold = self.config.window_duration() * 5;

        let mut buckets = self.buckets.write().await;
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < stale_threshold);
    }
}

/// Normalize source URL for rate limiting.
fn normalize_source_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            if let Some(host) = parsed.host_str() {
                let _ = parsed.set_host(Some(&host.to_lowercase()));
            }
            parsed.to_string()
        }
        Err(_) => url.to_lowercase(),
    }
}
