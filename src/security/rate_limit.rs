//! Fixed-window rate limiting.
//!
//! Counters live behind [`RateLimitStore`] so the in-process map can be
//! swapped for a shared store in multi-instance deployments. The in-memory
//! adapter is per process: each instance enforces its own quota.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::http::HeaderMap;
use dashmap::DashMap;

use crate::config::{RateLimitConfig, RateRule};

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    /// Requests admitted in the current window.
    pub count: u32,
    /// When the window ends (ms since the Unix epoch).
    pub reset_at_ms: u64,
}

impl WindowState {
    /// Apply one request to this window.
    fn admit(&mut self, rule: RateRule, now_ms: u64) -> RateDecision {
        if self.reset_at_ms <= now_ms {
            *self = Self {
                count: 1,
                reset_at_ms: now_ms.saturating_add(rule.window_ms),
            };
        } else if self.count < rule.max_requests {
            self.count += 1;
        } else {
            return RateDecision::Limited {
                retry_after_ms: self.reset_at_ms - now_ms,
            };
        }
        RateDecision::Allowed {
            count: self.count,
            remaining: rule.max_requests.saturating_sub(self.count),
            reset_at_ms: self.reset_at_ms,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed {
        count: u32,
        remaining: u32,
        reset_at_ms: u64,
    },
    Limited {
        retry_after_ms: u64,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::Allowed { .. } => 0,
            Self::Limited { retry_after_ms } => retry_after_ms.div_ceil(1000),
        }
    }
}

/// Storage for rate-limit windows.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current window for `key`, if one exists.
    async fn get(&self, key: &str) -> Option<WindowState>;

    /// Add one to the count of an existing window; returns the new count.
    async fn increment(&self, key: &str) -> Option<u32>;

    /// Start a new window holding one request.
    async fn reset(&self, key: &str, reset_at_ms: u64);

    /// Drop windows that ended at or before `now_ms`.
    async fn sweep(&self, _now_ms: u64) {}

    /// Apply one request to `key`. The default composes `get`, `increment`
    /// and `reset`, which is not atomic across concurrent callers; stores
    /// that can do the read-check-write under one lock should override it.
    async fn hit(&self, key: &str, rule: RateRule, now_ms: u64) -> RateDecision {
        let mut state = self.get(key).await.unwrap_or_default();
        let fresh = state.reset_at_ms <= now_ms;
        let decision = state.admit(rule, now_ms);
        if decision.is_allowed() {
            if fresh {
                self.reset(key, state.reset_at_ms).await;
            } else {
                self.increment(key).await;
            }
        }
        decision
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, WindowState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<WindowState> {
        self.entries.get(key).map(|e| *e)
    }

    async fn increment(&self, key: &str) -> Option<u32> {
        self.entries.get_mut(key).map(|mut e| {
            e.count += 1;
            e.count
        })
    }

    async fn reset(&self, key: &str, reset_at_ms: u64) {
        self.entries.insert(
            key.to_string(),
            WindowState {
                count: 1,
                reset_at_ms,
            },
        );
    }

    async fn sweep(&self, now_ms: u64) {
        self.entries.retain(|_, state| state.reset_at_ms > now_ms);
    }

    async fn hit(&self, key: &str, rule: RateRule, now_ms: u64) -> RateDecision {
        // The entry guard holds the shard lock for the whole update.
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.admit(rule, now_ms)
    }
}

/// Named quotas. Each scope keeps its own counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Default,
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
}

impl RateScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Login => "login",
            Self::Register => "register",
            Self::ForgotPassword => "forgot_password",
            Self::ResetPassword => "reset_password",
        }
    }

    pub fn rule(&self, config: &RateLimitConfig) -> RateRule {
        match self {
            Self::Default => config.default,
            Self::Login => config.login,
            Self::Register => config.register,
            Self::ForgotPassword => config.forgot_password,
            Self::ResetPassword => config.reset_password,
        }
    }
}

/// Fixed-window limiter over a pluggable store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Check and record one request from `client` against `rule`.
    pub async fn check(&self, scope: &str, client: &str, rule: RateRule) -> RateDecision {
        self.check_at(scope, client, rule, now_ms()).await
    }

    pub async fn check_at(&self, scope: &str, client: &str, rule: RateRule, now_ms: u64) -> RateDecision {
        self.store.sweep(now_ms).await;
        self.store.hit(&format!("{scope}:{client}"), rule, now_ms).await
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Identifier used to bucket a client: the socket peer IP, else the first
/// `X-Forwarded-For` hop, else `"unknown"` (all such clients share a bucket).
pub fn client_identifier(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const FORGOT: RateRule = RateRule::new(3, 300_000);

    #[tokio::test]
    async fn test_fourth_request_in_window_is_limited() {
        let limiter = RateLimiter::in_memory();
        let t0 = 1_000_000;

        for i in 0..3 {
            let d = limiter.check_at("forgot", "1.2.3.4", FORGOT, t0 + i).await;
            assert!(d.is_allowed(), "request {} should pass", i + 1);
        }
        let d = limiter.check_at("forgot", "1.2.3.4", FORGOT, t0 + 10).await;
        assert_eq!(d, RateDecision::Limited { retry_after_ms: 299_990 });
        assert_eq!(d.retry_after_secs(), 300);
    }

    #[tokio::test]
    async fn test_window_expiry_resets_counter() {
        let limiter = RateLimiter::in_memory();
        let t0 = 5_000;
        for _ in 0..4 {
            limiter.check_at("forgot", "c", FORGOT, t0).await;
        }

        let d = limiter.check_at("forgot", "c", FORGOT, t0 + 300_000).await;
        assert_eq!(
            d,
            RateDecision::Allowed {
                count: 1,
                remaining: 2,
                reset_at_ms: t0 + 600_000,
            }
        );
    }

    #[tokio::test]
    async fn test_scopes_and_clients_are_independent() {
        let limiter = RateLimiter::in_memory();
        let rule = RateRule::new(1, 1000);
        assert!(limiter.check_at("login", "a", rule, 0).await.is_allowed());
        assert!(!limiter.check_at("login", "a", rule, 1).await.is_allowed());
        assert!(limiter.check_at("login", "b", rule, 1).await.is_allowed());
        assert!(limiter.check_at("register", "a", rule, 1).await.is_allowed());
    }

    #[tokio::test]
    async fn test_sweep_evicts_stale_entries() {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(store.clone());
        let rule = RateRule::new(5, 100);

        limiter.check_at("s", "a", rule, 0).await;
        limiter.check_at("s", "b", rule, 0).await;
        assert_eq!(store.len(), 2);

        limiter.check_at("s", "c", rule, 150).await;
        assert_eq!(store.len(), 1);
    }

    /// A store that only implements the primitive operations, exercising the
    /// default `hit` composition.
    #[derive(Default)]
    struct PrimitiveStore {
        map: Mutex<HashMap<String, WindowState>>,
    }

    #[async_trait]
    impl RateLimitStore for PrimitiveStore {
        async fn get(&self, key: &str) -> Option<WindowState> {
            self.map.lock().unwrap().get(key).copied()
        }

        async fn increment(&self, key: &str) -> Option<u32> {
            let mut map = self.map.lock().unwrap();
            let state = map.get_mut(key)?;
            state.count += 1;
            Some(state.count)
        }

        async fn reset(&self, key: &str, reset_at_ms: u64) {
            self.map
                .lock()
                .unwrap()
                .insert(key.to_string(), WindowState { count: 1, reset_at_ms });
        }
    }

    #[tokio::test]
    async fn test_default_hit_composition() {
        let store = Arc::new(PrimitiveStore::default());
        let limiter = RateLimiter::new(store.clone());
        let rule = RateRule::new(2, 1000);

        assert!(limiter.check_at("x", "ip", rule, 10).await.is_allowed());
        assert!(limiter.check_at("x", "ip", rule, 20).await.is_allowed());
        assert!(!limiter.check_at("x", "ip", rule, 30).await.is_allowed());
        assert_eq!(
            store.get("x:ip").await,
            Some(WindowState { count: 2, reset_at_ms: 1010 })
        );

        assert!(limiter.check_at("x", "ip", rule, 1010).await.is_allowed());
        assert_eq!(store.get("x:ip").await.unwrap().count, 1);
    }

    #[test]
    fn test_client_identifier_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));

        let peer: SocketAddr = "198.51.100.2:5555".parse().unwrap();
        assert_eq!(client_identifier(Some(peer), &headers), "198.51.100.2");
        assert_eq!(client_identifier(None, &headers), "203.0.113.7");
        assert_eq!(client_identifier(None, &HeaderMap::new()), "unknown");
    }

    #[test]
    fn test_scope_rules() {
        let config = RateLimitConfig::default();
        assert_eq!(RateScope::ForgotPassword.rule(&config), FORGOT);
        assert_eq!(RateScope::Login.as_str(), "login");
    }
}
