//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a supervised
//! node container. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a node container.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Logging settings.
    pub log: LogConfig,

    /// ENS lookup settings used to resolve contract addresses.
    pub ens: EnsConfig,

    /// Dispatch registry settings.
    pub registry: RegistryConfig,

    /// Scanner version contract address (resolved through ENS).
    pub scanner_version_contract_address: String,

    /// Agent registry contract address (resolved through ENS).
    pub agent_registry_contract_address: String,

    /// Supervision timings and signal handling.
    pub supervisor: SupervisorConfig,

    /// Health endpoint settings.
    pub health: HealthConfig,

    /// Chain head monitor settings.
    pub chain: ChainConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error, off).
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// ENS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnsConfig {
    /// JSON-RPC endpoint used for ENS lookups.
    pub json_rpc_url: String,

    /// Address of the ENS registry contract.
    pub contract_address: String,

    /// Timeout for a single ENS call in seconds.
    pub timeout_secs: u64,
}

impl Default for EnsConfig {
    fn default() -> Self {
        Self {
            json_rpc_url: "http://localhost:8545".to_string(),
            // Mainnet ENS registry.
            contract_address: "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Dispatch registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// Dispatch contract address. Filled from ENS only when empty.
    pub contract_address: String,
}

/// Supervisor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Deadline for a single service to report that it started.
    pub startup_timeout_secs: u64,

    /// Deadline for a single service stop.
    pub stop_timeout_secs: u64,

    /// Exit immediately when a second termination signal arrives.
    pub force_exit_on_second_signal: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: 60,
            stop_timeout_secs: 30,
            force_exit_on_second_signal: true,
        }
    }
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve the health endpoint.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8090".to_string(),
        }
    }
}

/// Chain head monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Enable the chain monitor service.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Head polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            poll_interval_ms: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.supervisor.startup_timeout_secs, 60);
        assert!(config.supervisor.force_exit_on_second_signal);
        assert!(config.registry.contract_address.is_empty());
        assert!(!config.chain.enabled);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            [log]
            level = "debug"

            [supervisor]
            startup_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.supervisor.startup_timeout_secs, 5);
        assert_eq!(config.supervisor.stop_timeout_secs, 30);
        assert_eq!(config.health.bind_address, "0.0.0.0:8090");
    }
}
