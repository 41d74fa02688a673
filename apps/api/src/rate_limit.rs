//! Per-user request throttling for the AI endpoints.
//!
//! Fixed window per key: the window opens on the first request and closes
//! `window_ms` later, at which point the next request starts a fresh one.
//! State is process-local and lost on restart. This is a cost-control guard,
//! not a security boundary, and it does not coordinate across instances.
//! Callers only see the [`RateLimiter`] trait so a shared store can replace
//! [`InMemoryRateLimiter`] without touching handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// How often expired entries are swept out of the map.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Namespace for the counter. Endpoints with different scopes never share a window.
    pub scope: &'static str,
    pub max_requests: u32,
    pub window_ms: i64,
}

impl RateLimitConfig {
    /// The limiter key for one caller within this scope.
    pub fn key_for(&self, subject: &str) -> String {
        format!("{}:{subject}", self.scope)
    }
}

/// `/ai-coach`: 20 requests per minute.
pub const CHAT_LIMIT: RateLimitConfig = RateLimitConfig {
    scope: "ai-coach",
    max_requests: 20,
    window_ms: 60_000,
};

/// `/ai-weekly-summary`: 5 requests per minute. Summaries are larger and rarer.
pub const SUMMARY_LIMIT: RateLimitConfig = RateLimitConfig {
    scope: "ai-weekly-summary",
    max_requests: 5,
    window_ms: 60_000,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, never less than 1.
    pub fn retry_after_secs(&self) -> i64 {
        let ms = (self.reset_at - Utc::now()).num_milliseconds();
        ((ms + 999) / 1000).max(1)
    }
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check + record with an explicit clock. The dashmap entry guard holds the
    /// shard lock for the whole read-check-write, so increments are never lost.
    pub fn check_at(
        &self,
        key: &str,
        config: RateLimitConfig,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let fresh = RateLimitEntry {
            count: 1,
            window_reset_at: now + chrono::Duration::milliseconds(config.window_ms),
        };
        let allowed = |entry: &RateLimitEntry| RateLimitDecision {
            allowed: true,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(entry.count),
            reset_at: entry.window_reset_at,
        };

        match self.entries.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                allowed(&fresh)
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.window_reset_at <= now {
                    *entry = fresh;
                    return allowed(&*entry);
                }
                if entry.count >= config.max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        limit: config.max_requests,
                        remaining: 0,
                        reset_at: entry.window_reset_at,
                    };
                }
                entry.count += 1;
                allowed(&*entry)
            }
        }
    }

    /// Drops every entry whose window has closed. Returns how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.window_reset_at > now);
        before.saturating_sub(self.entries.len())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Spawns the periodic sweep on the runtime. It never touches request tasks.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let removed = limiter.sweep_at(Utc::now());
                if removed > 0 {
                    debug!("Rate limiter swept {removed} expired entries");
                }
            }
        })
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, Utc::now())
    }
}

/// `X-RateLimit-*` headers describing a decision. Reset is in epoch seconds.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_at.timestamp()),
    );
    headers
}
