//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! NodeConfig.ens (RPC URL, registry address)
//!     → ens.rs (namehash → registry.resolver → resolver.addr)
//!     → contracts.rs (write resolved addresses into NodeConfig)
//!
//! NodeConfig.chain
//!     → client.rs (RPC connection with timeouts and failover)
//!     → services::chain (head monitor)
//! ```
//!
//! # Constraints
//! - All RPC calls have configurable timeouts
//! - Contract resolution failure is non-fatal for the container

pub mod client;
pub mod contracts;
pub mod ens;
pub mod types;

pub use client::BlockchainClient;
pub use contracts::{apply_contracts, set_contracts};
pub use ens::{ContractResolver, EnsContractResolver};
pub use types::{BlockchainError, BlockchainResult, ChainId, NodeContracts};
