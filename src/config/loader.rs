//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::OracleConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const RPC_URL_ENV_VAR: &str = "ORACLE_RPC_URL";
pub const WS_URL_ENV_VAR: &str = "ORACLE_WS_URL";
pub const CONTRACT_ADDRESS_ENV_VAR: &str = "ORACLE_CONTRACT_ADDRESS";
pub const POLL_INTERVAL_ENV_VAR: &str = "ORACLE_POLL_INTERVAL_SECONDS";
pub const ASSET_PAIRS_ENV_VAR: &str = "ORACLE_ASSET_PAIRS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

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

/// Load configuration from an optional TOML file, apply environment overrides
/// and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<OracleConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => OracleConfig::default(),
    };

    let config = apply_env_overrides(config, |name| std::env::var(name).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file configuration.
pub fn apply_env_overrides<F>(mut config: OracleConfig, lookup: F) -> Result<OracleConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(RPC_URL_ENV_VAR) {
        config.node.rpc_url = url;
    }
    if let Some(url) = lookup(WS_URL_ENV_VAR) {
        config.node.ws_url = Some(url);
    }
    if let Some(address) = lookup(CONTRACT_ADDRESS_ENV_VAR) {
        config.oracle.contract_address = address;
    }
    if let Some(interval) = lookup(POLL_INTERVAL_ENV_VAR) {
        config.oracle.poll_interval_secs = interval.trim().parse().map_err(|e| ConfigError::Env {
            name: POLL_INTERVAL_ENV_VAR,
            reason: format!("{}", e),
        })?;
    }
    if let Some(pairs) = lookup(ASSET_PAIRS_ENV_VAR) {
        config.oracle.asset_pairs = serde_json::from_str(&pairs).map_err(|e| ConfigError::Env {
            name: ASSET_PAIRS_ENV_VAR,
            reason: format!("expected a JSON list of strings: {}", e),
        })?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_env_overrides(
            OracleConfig::default(),
            lookup_from(&[
                (RPC_URL_ENV_VAR, "https://rpc.example.org"),
                (CONTRACT_ADDRESS_ENV_VAR, "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
                (POLL_INTERVAL_ENV_VAR, "15"),
                (ASSET_PAIRS_ENV_VAR, r#"["SOL/USDT"]"#),
            ]),
        )
        .unwrap();

        assert_eq!(config.node.rpc_url, "https://rpc.example.org");
        assert_eq!(config.oracle.poll_interval_secs, 15);
        assert_eq!(config.oracle.asset_pairs, vec!["SOL/USDT"]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_asset_pairs_env() {
        let result = apply_env_overrides(
            OracleConfig::default(),
            lookup_from(&[(ASSET_PAIRS_ENV_VAR, "BTC/USDT")]),
        );
        assert!(matches!(result, Err(ConfigError::Env { name: ASSET_PAIRS_ENV_VAR, .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Some(Path::new("does-not-exist.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
