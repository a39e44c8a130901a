//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0)
//! - Validate addresses, URLs and the log level
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::NodeConfig;
use crate::observability::logging;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("log.level: unknown level '{0}'")]
    LogLevel(String),

    #[error("{field}: must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: invalid contract address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidSocketAddr { field: &'static str, value: String },
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if logging::parse_level(&config.log.level).is_err() {
        errors.push(ValidationError::LogLevel(config.log.level.clone()));
    }

    if config.supervisor.startup_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "supervisor.startup_timeout_secs",
        });
    }
    if config.supervisor.stop_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "supervisor.stop_timeout_secs",
        });
    }

    if !config.ens.contract_address.is_empty() {
        check_url(&mut errors, "ens.json_rpc_url", &config.ens.json_rpc_url);
        check_address(&mut errors, "ens.contract_address", &config.ens.contract_address);
    }
    check_optional_address(&mut errors, "registry.contract_address", &config.registry.contract_address);
    check_optional_address(
        &mut errors,
        "scanner_version_contract_address",
        &config.scanner_version_contract_address,
    );
    check_optional_address(
        &mut errors,
        "agent_registry_contract_address",
        &config.agent_registry_contract_address,
    );

    if config.health.enabled && config.health.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "health.bind_address",
            value: config.health.bind_address.clone(),
        });
    }

    if config.chain.enabled {
        check_url(&mut errors, "chain.rpc_url", &config.chain.rpc_url);
        if config.chain.rpc_timeout_secs == 0 {
            errors.push(ValidationError::ZeroDuration {
                field: "chain.rpc_timeout_secs",
            });
        }
        if config.chain.poll_interval_ms == 0 {
            errors.push(ValidationError::ZeroDuration {
                field: "chain.poll_interval_ms",
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<url::Url>().is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<Address>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_optional_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.is_empty() {
        check_address(errors, field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&NodeConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = NodeConfig::default();
        config.log.level = "loud".to_string();
        config.supervisor.startup_timeout_secs = 0;
        config.registry.contract_address = "not-an-address".to_string();
        config.health.bind_address = "nowhere".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::LogLevel("loud".to_string())));
        assert!(errors.contains(&ValidationError::ZeroDuration {
            field: "supervisor.startup_timeout_secs"
        }));
    }

    #[test]
    fn test_disabled_sections_are_not_checked() {
        let mut config = NodeConfig::default();
        config.chain.rpc_url = "::bad::".to_string();
        config.health.enabled = false;
        config.health.bind_address = "nowhere".to_string();
        config.ens.contract_address.clear();
        config.ens.json_rpc_url = "::bad::".to_string();

        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::InvalidUrl {
            field: "chain.rpc_url",
            value: "x".to_string(),
        };
        assert_eq!(err.to_string(), "chain.rpc_url: invalid URL 'x'");
    }
}
