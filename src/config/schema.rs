//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream backend service.
    pub backend: BackendConfig,

    /// Public URLs used to build redirects and invite links.
    pub links: LinksConfig,

    /// Cross-origin policy for `/api` routes.
    pub cors: CorsConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Wallet provider settings.
    pub wallet: WalletConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            shutdown_grace_secs: 10,
        }
    }
}

/// Backend service the gateway forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; request paths are appended verbatim.
    pub base_url: String,

    /// Optional total request timeout in seconds. Unset means the call waits
    /// as long as the HTTP client does.
    pub timeout_secs: Option<u64>,

    /// Optional connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

/// Public-facing URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Frontend origin, target of OAuth callbacks.
    pub frontend_url: String,

    /// Base for shareable invite links.
    pub app_url: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable the CORS gate on API routes.
    pub enabled: bool,

    /// Allowed origins. Empty means the origin of `links.frontend_url`;
    /// `"*"` allows any origin and requires `allow_credentials = false`.
    pub allowed_origins: Vec<String>,

    /// Methods advertised on preflight.
    pub allowed_methods: Vec<String>,

    /// Request headers advertised on preflight.
    pub allowed_headers: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            allow_credentials: true,
            max_age_secs: 86_400,
        }
    }
}

/// A fixed-window quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateRule {
    /// Requests admitted per window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateRule {
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }
}

/// Rate limiting configuration, one rule per scope.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Rule for every endpoint without a dedicated scope.
    pub default: RateRule,

    pub login: RateRule,
    pub register: RateRule,
    pub forgot_password: RateRule,
    pub reset_password: RateRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default: RateRule::new(100, 60_000),
            login: RateRule::new(5, 15 * 60_000),
            register: RateRule::new(3, 60 * 60_000),
            forgot_password: RateRule::new(3, 5 * 60_000),
            reset_password: RateRule::new(5, 15 * 60_000),
        }
    }
}

/// Wallet provider (Openfort) settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Publishable key, safe to hand to browsers.
    pub publishable_key: String,

    /// Secret key. Never serialized into responses.
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// Target chain id (Ethereum Sepolia by default).
    pub chain_id: u64,
}

impl WalletConfig {
    pub fn has_secret_key(&self) -> bool {
        !self.secret_key.trim().is_empty()
    }
}

// Hand-written so the secret key never reaches logs.
impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("publishable_key", &self.publishable_key)
            .field("secret_key", &if self.has_secret_key() { "<redacted>" } else { "<unset>" })
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            publishable_key: String::new(),
            secret_key: String::new(),
            chain_id: 11_155_111,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Mark auth cookies `Secure`.
    pub secure_cookies: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            secure_cookies: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_secret_is_redacted() {
        let wallet = WalletConfig {
            secret_key: "sk_live_123".into(),
            ..WalletConfig::default()
        };
        assert!(wallet.has_secret_key());
        let debug = format!("{:?}", GatewayConfig { wallet, ..GatewayConfig::default() });
        assert!(!debug.contains("sk_live_123"));
        assert!(debug.contains("<redacted>"));
        assert!(!WalletConfig::default().has_secret_key());
    }
}
