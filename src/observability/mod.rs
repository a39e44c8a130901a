//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events; level applied from config)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`service`, `signal`, `exec_id`) instead of formatted text
//! - Metrics are cheap (atomic increments) and off unless an exporter is installed

pub mod logging;
pub mod metrics;
