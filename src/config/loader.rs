//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
///
/// The variable names are shared with the web frontend, so they keep the
/// `NEXT_PUBLIC_` prefix.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("ROOMY_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("NEXT_PUBLIC_API_URL") {
        config.backend.base_url = v;
    }
    if let Some(v) = get("NEXT_PUBLIC_FRONTEND_URL") {
        config.links.frontend_url = v;
    }
    if let Some(v) = get("NEXT_PUBLIC_APP_URL") {
        config.links.app_url = v;
    }
    if let Some(v) = get("NEXT_PUBLIC_OPENFORT_PUBLISHABLE_KEY") {
        config.wallet.publishable_key = v;
    }
    if let Some(v) = get("OPENFORT_SECRET_KEY") {
        config.wallet.secret_key = v;
    }
    if let Some(v) = get("NEXT_PUBLIC_OPENFORT_CHAIN_ID") {
        config.wallet.chain_id = v.trim().parse().map_err(|_| ConfigError::Env {
            var: "NEXT_PUBLIC_OPENFORT_CHAIN_ID",
            value: v.clone(),
        })?;
    }

    Ok(())
}
