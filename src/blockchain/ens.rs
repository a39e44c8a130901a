//! ENS lookups for node contract addresses.
//!
//! Resolution follows EIP-137: the name is hashed with [`namehash`], the
//! registry is asked for the name's resolver, and the resolver is asked for
//! the address.

use std::time::Duration;

use alloy::primitives::{keccak256, Address, B256};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::client::http_provider;
use crate::blockchain::types::{BlockchainError, BlockchainResult, NodeContracts};
use crate::config::EnsConfig;

sol! {
    #[sol(rpc)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    #[sol(rpc)]
    interface IAddrResolver {
        function addr(bytes32 node) external view returns (address);
    }
}

pub const DISPATCH_NAME: &str = "dispatch.forta.eth";
pub const SCANNER_VERSION_NAME: &str = "scanner-node-version.forta.eth";
pub const AGENT_REGISTRY_NAME: &str = "agents.registries.forta.eth";

/// Source of the contract addresses a node needs.
#[async_trait]
pub trait ContractResolver: Send + Sync {
    async fn resolve_contracts(&self) -> BlockchainResult<NodeContracts>;
}

/// EIP-137 namehash.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        node = keccak256(buf);
    }
    node
}

/// Resolves node contracts through an ENS registry over JSON-RPC.
#[derive(Clone)]
pub struct EnsContractResolver {
    provider: DynProvider,
    registry: Address,
    timeout_duration: Duration,
}

impl EnsContractResolver {
    pub fn new(config: &EnsConfig) -> BlockchainResult<Self> {
        let registry: Address = config.contract_address.parse().map_err(|e| {
            BlockchainError::InvalidConfig(format!(
                "Invalid ENS registry address '{}': {}",
                config.contract_address, e
            ))
        })?;

        Ok(Self {
            provider: http_provider(&config.json_rpc_url)?,
            registry,
            timeout_duration: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Resolve a single ENS name to an address.
    pub async fn resolve(&self, name: &str) -> BlockchainResult<Address> {
        let node = namehash(name);

        let registry = IEnsRegistry::new(self.registry, self.provider.clone());
        let resolver = self.bounded(registry.resolver(node).call()).await?;
        if resolver == Address::ZERO {
            return Err(BlockchainError::NameNotFound(name.to_string()));
        }

        let resolver = IAddrResolver::new(resolver, self.provider.clone());
        let address = self.bounded(resolver.addr(node).call()).await?;
        if address == Address::ZERO {
            return Err(BlockchainError::NameNotFound(name.to_string()));
        }

        tracing::debug!(name, address = %address, "Resolved ENS name");
        Ok(address)
    }

    async fn bounded<F, T, E>(&self, call: F) -> BlockchainResult<T>
    where
        F: std::future::IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, call.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BlockchainError::Rpc(e.to_string())),
            Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
        }
    }
}

#[async_trait]
impl ContractResolver for EnsContractResolver {
    async fn resolve_contracts(&self) -> BlockchainResult<NodeContracts> {
        Ok(NodeContracts {
            dispatch: self.resolve(DISPATCH_NAME).await?,
            scanner_version: self.resolve(SCANNER_VERSION_NAME).await?,
            agent: self.resolve(AGENT_REGISTRY_NAME).await?,
        })
    }
}

impl std::fmt::Debug for EnsContractResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsContractResolver")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
