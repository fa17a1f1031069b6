//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that tracked pairs normalise and are unique
//! - Validate value ranges (intervals and timeouts > 0)
//! - Check the configured request event against the contract interface
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OracleConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::contract::OracleInterface;
use crate::config::schema::OracleConfig;
use crate::oracle::assets::AssetPair;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no asset pairs configured")]
    NoAssetPairs,

    #[error("invalid asset pair '{0}'")]
    InvalidAssetPair(String),

    #[error("duplicate asset pair '{0}'")]
    DuplicateAssetPair(String),

    #[error("invalid contract address '{0}'")]
    InvalidContractAddress(String),

    #[error("invalid RPC URL '{0}'")]
    InvalidRpcUrl(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("event '{0}' is not declared by the oracle contract interface")]
    UnknownRequestEvent(String),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &OracleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.oracle.asset_pairs.is_empty() {
        errors.push(ValidationError::NoAssetPairs);
    }
    let mut seen = HashSet::new();
    for raw in &config.oracle.asset_pairs {
        match AssetPair::parse(raw) {
            Ok(pair) => {
                if !seen.insert(pair.clone()) {
                    errors.push(ValidationError::DuplicateAssetPair(pair.to_string()));
                }
            }
            Err(_) => errors.push(ValidationError::InvalidAssetPair(raw.clone())),
        }
    }

    if config.oracle.contract_address.parse::<Address>().is_err() {
        errors.push(ValidationError::InvalidContractAddress(
            config.oracle.contract_address.clone(),
        ));
    }

    if config.node.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::InvalidRpcUrl(config.node.rpc_url.clone()));
    }

    let positive = [
        ("oracle.poll_interval_secs", config.oracle.poll_interval_secs),
        ("node.connect_timeout_secs", config.node.connect_timeout_secs),
        ("node.request_timeout_secs", config.node.request_timeout_secs),
        ("price_source.request_timeout_secs", config.price_source.request_timeout_secs),
        ("listener.poll_interval_ms", config.listener.poll_interval_ms),
        ("submitter.gas_limit", config.submitter.gas_limit),
        ("submitter.receipt_timeout_secs", config.submitter.receipt_timeout_secs),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(name));
        }
    }

    if OracleInterface::declared()
        .event(&config.listener.request_event)
        .is_none()
    {
        errors.push(ValidationError::UnknownRequestEvent(
            config.listener.request_event.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OracleConfig {
        let mut config = OracleConfig::default();
        config.oracle.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.oracle.contract_address = "not-an-address".to_string();
        config.oracle.poll_interval_secs = 0;
        config.listener.request_event = "PriceRequested".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroValue("oracle.poll_interval_secs")));
        assert!(errors.contains(&ValidationError::UnknownRequestEvent("PriceRequested".into())));
    }

    #[test]
    fn test_duplicate_pairs_after_normalisation() {
        let mut config = valid_config();
        config.oracle.asset_pairs = vec!["BTC/USDT".into(), "btc-usdt".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateAssetPair("BTC/USDT".into())]);
    }

    #[test]
    fn test_invalid_pair() {
        let mut config = valid_config();
        config.oracle.asset_pairs = vec!["BTCUSDT".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidAssetPair("BTCUSDT".into())]);
    }
}
