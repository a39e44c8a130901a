//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Container (container.rs):
//!     Load config → Resolve contracts → Apply log level → Build services
//!
//! Run (supervisor.rs):
//!     initialize → ExecutionContext + CancelHandle → start_services
//!
//! Startup (startup.rs):
//!     Start each service in order → bounded by deadline → record started
//!
//! Shutdown (shutdown.rs):
//!     Run ends → stop started services in reverse order
//!
//! Signals (signals.rs):
//!     SIGHUP/SIGINT/SIGTERM/SIGQUIT → cancel the run (first signal)
//!                                   → escalation policy (every later one)
//! ```
//!
//! # Design Decisions
//! - One cancellation token per run; the first cause recorded wins
//! - First task error wins; later errors are only logged
//! - A stop runs at most once per started service

pub mod container;
pub mod context;
pub mod group;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use container::{container_main, Container, RunOutcome};
pub use context::{current_exec_id, CancelCause, CancelHandle, ExecId, ExecutionContext};
pub use group::ProcessGroup;
pub use shutdown::StartedServices;
pub use signals::{EscalationPolicy, ShutdownSignal, SignalChannel};
pub use startup::StartOutcome;
pub use supervisor::{SupervisorError, SupervisorRuntime, SupervisorSettings};
