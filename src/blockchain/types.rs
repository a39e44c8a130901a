//! Chain-specific types and error definitions.

use alloy::primitives::Address;
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Configured value could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// An ENS name has no resolver or resolves to the zero address.
    #[error("ENS name '{0}' is not registered")]
    NameNotFound(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Contract addresses resolved for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContracts {
    /// Dispatch (scanner registry) contract.
    pub dispatch: Address,
    /// Scanner node version contract.
    pub scanner_version: Address,
    /// Agent registry contract.
    pub agent: Address,
}
