//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, body limit > 0)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RateRule};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL {value:?} ({reason})")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("rate_limit.{scope}: {reason}")]
    InvalidRateRule { scope: &'static str, reason: &'static str },

    #[error("{field}: {reason}")]
    OutOfRange { field: &'static str, reason: &'static str },
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_url(&mut errors, "backend.base_url", &config.backend.base_url);
    check_url(&mut errors, "links.frontend_url", &config.links.frontend_url);
    check_url(&mut errors, "links.app_url", &config.links.app_url);

    if config.backend.timeout_secs == Some(0) {
        errors.push(ValidationError::OutOfRange {
            field: "backend.timeout_secs",
            reason: "must be greater than zero when set",
        });
    }
    if config.backend.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::OutOfRange {
            field: "backend.connect_timeout_secs",
            reason: "must be greater than zero when set",
        });
    }

    let limits = &config.rate_limit;
    for (scope, rule) in [
        ("default", limits.default),
        ("login", limits.login),
        ("register", limits.register),
        ("forgot_password", limits.forgot_password),
        ("reset_password", limits.reset_password),
    ] {
        check_rule(&mut errors, scope, rule);
    }

    let wildcard = config.cors.allowed_origins.iter().any(|o| o.trim() == "*");
    if wildcard && config.cors.allow_credentials {
        errors.push(ValidationError::OutOfRange {
            field: "cors.allowed_origins",
            reason: "\"*\" cannot be combined with allow_credentials",
        });
    }
    for origin in config.cors.allowed_origins.iter().map(|o| o.trim()) {
        if !origin.is_empty() && origin != "*" {
            check_url(&mut errors, "cors.allowed_origins", origin);
        }
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "security.max_body_size",
            reason: "must be greater than zero",
        });
    }

    if config.wallet.chain_id == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "wallet.chain_id",
            reason: "must be greater than zero",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn check_rule(errors: &mut Vec<ValidationError>, scope: &'static str, rule: RateRule) {
    if rule.max_requests == 0 {
        errors.push(ValidationError::InvalidRateRule {
            scope,
            reason: "max_requests must be greater than zero",
        });
    }
    if rule.window_ms == 0 {
        errors.push(ValidationError::InvalidRateRule {
            scope,
            reason: "window_ms must be greater than zero",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.backend.base_url = "ftp://backend".into();
        config.rate_limit.login.window_ms = 0;
        config.security.max_body_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidRateRule {
            scope: "login",
            reason: "window_ms must be greater than zero",
        }));
    }

    #[test]
    fn test_wildcard_origin_with_credentials_is_rejected() {
        let mut config = GatewayConfig::default();
        config.cors.allowed_origins = vec!["*".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::OutOfRange { field: "cors.allowed_origins", .. }));

        config.cors.allow_credentials = false;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
