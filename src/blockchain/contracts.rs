//! Applies resolved contract addresses to a node configuration.

use crate::blockchain::ens::ContractResolver;
use crate::blockchain::types::{BlockchainResult, NodeContracts};
use crate::config::NodeConfig;

/// Write resolved addresses into `config`.
///
/// The dispatch address only fills an empty `registry.contract_address`; an
/// operator-supplied registry always wins. The other two are overwritten.
pub fn apply_contracts(config: &mut NodeConfig, contracts: &NodeContracts) {
    if config.registry.contract_address.is_empty() {
        config.registry.contract_address = contracts.dispatch.to_string();
    }
    config.scanner_version_contract_address = contracts.scanner_version.to_string();
    config.agent_registry_contract_address = contracts.agent.to_string();
}

/// Resolve contracts with `resolver` and apply them to `config`.
///
/// On error `config` is left untouched.
pub async fn set_contracts(
    config: &mut NodeConfig,
    resolver: &dyn ContractResolver,
) -> BlockchainResult<()> {
    let contracts = resolver.resolve_contracts().await?;
    apply_contracts(config, &contracts);
    tracing::info!(
        registry = %config.registry.contract_address,
        scanner_version = %config.scanner_version_contract_address,
        agent_registry = %config.agent_registry_contract_address,
        "Contract addresses resolved"
    );
    Ok(())
}
