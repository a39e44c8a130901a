//! Container entry point.
//!
//! # Flow
//! ```text
//! load config ─► resolve contracts ─► apply log level ─► metrics exporter
//!     ─► "Starting <name>" ─► initialize run ─► factory(ctx, config)
//!     ─► start_services ─► "Stopping <name>"
//! ```
//!
//! Every failure is logged here and reported through [`RunOutcome`]; nothing
//! is turned into a process exit code at this layer. Contract resolution is
//! the one step whose failure does not abort the run.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::blockchain::{set_contracts, ContractResolver, EnsContractResolver};
use crate::config::{self, ConfigError, NodeConfig};
use crate::lifecycle::context::{CancelCause, ExecutionContext};
use crate::lifecycle::supervisor::{SupervisorError, SupervisorRuntime, SupervisorSettings};
use crate::observability::logging::{self, LogHandle, LoggingError};
use crate::observability::metrics;
use crate::services::{ServiceError, ServiceRef};

/// How a container run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Configuration could not be loaded or validated; nothing started.
    ConfigFailed(ConfigError),
    /// The configured log level could not be applied; nothing started.
    LogLevelFailed(LoggingError),
    /// The supervisor could not be initialized; nothing started.
    InitFailed(SupervisorError),
    /// The service factory failed; nothing started.
    ConstructionFailed(ServiceError),
    /// Services were supervised; carries the run's first error.
    Finished(Result<(), SupervisorError>),
}

impl RunOutcome {
    /// True when services were handed to the supervisor.
    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished(_))
    }
}

#[derive(Debug)]
enum ConfigSource {
    Path(PathBuf),
    Value(Box<NodeConfig>),
}

/// A named node container: builds its services from config and supervises them.
pub struct Container {
    name: String,
    config: ConfigSource,
    resolver: Option<Arc<dyn ContractResolver>>,
    log_handle: Option<LogHandle>,
    runtime: Option<SupervisorRuntime>,
}

impl Container {
    /// A container reading its config from `NODE_CONFIG_PATH` (or the default path).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ConfigSource::Path(config::config_path_from_env()),
            resolver: None,
            log_handle: None,
            runtime: None,
        }
    }

    /// Read config from `path`.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = ConfigSource::Path(path.into());
        self
    }

    /// Use an already built config. It is still validated.
    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = ConfigSource::Value(Box::new(config));
        self
    }

    /// Resolve contracts with `resolver` instead of ENS from config.
    pub fn resolver(mut self, resolver: Arc<dyn ContractResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Apply the configured log level through `handle`.
    pub fn log_handle(mut self, handle: LogHandle) -> Self {
        self.log_handle = Some(handle);
        self
    }

    /// Supervise with `runtime` instead of one built from config.
    pub fn runtime(mut self, runtime: SupervisorRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Run the container to completion.
    pub async fn run<F>(self, factory: F) -> RunOutcome
    where
        F: FnOnce(&ExecutionContext, NodeConfig) -> Result<Vec<ServiceRef>, ServiceError>,
    {
        let name = self.name.clone();

        let mut config = match self.load_config() {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(container = %name, error = %err, "could not get config for container");
                return RunOutcome::ConfigFailed(err);
            }
        };

        self.resolve_contracts(&mut config).await;

        if let Err(err) = self.apply_log_level(&config.log.level) {
            tracing::error!(error = %err, "could not initialize log level");
            return RunOutcome::LogLevelFailed(err);
        }

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse::<SocketAddr>() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        tracing::info!("Starting {}", name);

        let mut runtime = self
            .runtime
            .unwrap_or_else(|| SupervisorRuntime::new(SupervisorSettings::from(&config.supervisor)));
        let (ctx, cancel) = match runtime.initialize() {
            Ok(run) => run,
            Err(err) => {
                tracing::error!(error = %err, "could not initialize supervisor");
                return RunOutcome::InitFailed(err);
            }
        };

        let services = match factory(&ctx, config) {
            Ok(services) => services,
            Err(err) => {
                tracing::error!(error = %err, "could not initialize services");
                cancel.cancel(CancelCause::Requested);
                return RunOutcome::ConstructionFailed(err);
            }
        };

        let result = runtime.start_services(&ctx, &cancel, services).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "error running services");
        }

        tracing::info!("Stopping {}", name);
        cancel.cancel(CancelCause::Requested);
        RunOutcome::Finished(result)
    }

    fn load_config(&self) -> Result<NodeConfig, ConfigError> {
        match &self.config {
            ConfigSource::Path(path) => config::load_config(path),
            ConfigSource::Value(config) => {
                config::validation::validate_config(config).map_err(ConfigError::Validation)?;
                Ok(config.as_ref().clone())
            }
        }
    }

    async fn resolve_contracts(&self, config: &mut NodeConfig) {
        let resolver = match &self.resolver {
            Some(resolver) => Arc::clone(resolver),
            None if config.ens.contract_address.is_empty() => {
                tracing::info!("ENS registry not configured, skipping contract resolution");
                return;
            }
            None => match EnsContractResolver::new(&config.ens) {
                Ok(resolver) => Arc::new(resolver) as Arc<dyn ContractResolver>,
                Err(err) => {
                    tracing::error!(error = %err, "could not initialize contracts for config");
                    return;
                }
            },
        };

        if let Err(err) = set_contracts(config, resolver.as_ref()).await {
            tracing::error!(error = %err, "could not initialize contracts for config");
        }
    }

    fn apply_log_level(&self, level: &str) -> Result<(), LoggingError> {
        match &self.log_handle {
            Some(handle) => handle.set_level(level),
            None => logging::parse_level(level).map(|_| ()),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Install logging and run a container named `name` with config from the environment.
///
/// Always returns normally; failures are logged.
pub async fn container_main<F>(name: &str, factory: F)
where
    F: FnOnce(&ExecutionContext, NodeConfig) -> Result<Vec<ServiceRef>, ServiceError>,
{
    let mut container = Container::new(name);
    match logging::init() {
        Ok(handle) => container = container.log_handle(handle),
        Err(err) => tracing::warn!(error = %err, "using existing log subscriber"),
    }
    let _ = container.run(factory).await;
}
