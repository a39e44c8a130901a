//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state (chain id, block number)
//! - Handle timeouts and network errors gracefully
//! - Provide health check for blockchain connectivity

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};
use crate::config::ChainConfig;
use crate::observability::metrics;

/// Build a type-erased HTTP provider for `url`.
pub fn http_provider(url: &str) -> BlockchainResult<DynProvider> {
    let url: url::Url = url
        .parse()
        .map_err(|e| BlockchainError::InvalidConfig(format!("Invalid RPC URL '{}': {}", url, e)))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: ChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// No request is made here; connectivity is checked by
    /// [`BlockchainClient::verify_chain_id`].
    pub fn new(config: ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = vec![http_provider(&config.rpc_url)?];

        for url_str in &config.failover_urls {
            match http_provider(url_str) {
                Ok(provider) => providers.push(provider),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_chain_id()).await {
                Ok(Ok(result)) => return Ok(ChainId(result)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        Err(BlockchainError::Rpc("All RPC providers failed".to_string()))
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.get_block_number()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(BlockchainError::Rpc("All providers failed to get block number".to_string()))
    }

    /// Check if the blockchain is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
