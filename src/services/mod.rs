//! Supervised services.
//!
//! # Data Flow
//! ```text
//! service factory (NodeConfig, ExecutionContext)
//!     → Vec<ServiceRef>            (ordered)
//!     → lifecycle::startup         (start each, bounded by the startup deadline)
//!     → lifecycle::shutdown        (stop in reverse start order)
//! ```
//!
//! # Contract
//! - `start` returns once the service is up; `Ok` means started, `Err` means
//!   the whole run must be aborted
//! - `start` may run on its own task while later services are launched, and
//!   may be abandoned if it misses the deadline
//! - `stop` errors are logged, never propagated
//! - `name` is stable and used in logs and metric labels

pub mod chain;
pub mod health;

use std::sync::Arc;

use async_trait::async_trait;

pub use chain::ChainMonitor;
pub use health::HealthServer;

/// Error returned by service start/stop.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// A component whose lifetime is managed by the supervisor.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), ServiceError>;

    async fn stop(&self) -> Result<(), ServiceError>;
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;
