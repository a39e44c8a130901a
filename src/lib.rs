//! Node Supervisor Library
//!
//! Runs a node container's services under one supervised run: ordered,
//! deadline-bounded startup, signal-driven cancellation and reverse-order
//! shutdown.

pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod services;

pub use config::NodeConfig;
pub use lifecycle::{
    container_main, current_exec_id, CancelCause, Container, ExecutionContext, RunOutcome,
    SupervisorError, SupervisorRuntime, SupervisorSettings,
};
pub use services::{Service, ServiceError, ServiceRef};
