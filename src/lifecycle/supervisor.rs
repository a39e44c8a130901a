//! Supervisor runtime: the process-wide state of supervision.
//!
//! [`SupervisorRuntime`] owns the signal channel and the process group of the
//! current run. A run is one [`SupervisorRuntime::initialize`] followed by one
//! [`SupervisorRuntime::start_services`].
//!
//! ```text
//! initialize()
//!   ├─► ensure signal channel (+ OS forwarder)        created once, reused
//!   ├─► ExecutionContext::init()                       fresh exec ID + token
//!   ├─► ProcessGroup::new()                            re-armed every run
//!   └─► SignalChannel::arm()                           one listener per run
//!
//! start_services(ctx, cancel, services)
//!   ├─► group.spawn(watcher)        returns Cancelled(cause) once ctx is done
//!   ├─► startup::start_all()        bounded start, in order
//!   ├─► group.wait()                first error wins
//!   └─► StartedServices::stop_all() reverse start order
//! ```

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SupervisorConfig;
use crate::lifecycle::context::{CancelCause, CancelHandle, ExecutionContext};
use crate::lifecycle::group::ProcessGroup;
use crate::lifecycle::signals::{EscalationPolicy, ShutdownSignal, SignalChannel};
use crate::lifecycle::startup;
use crate::services::ServiceRef;

/// Deadline for a single service to report started.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for a single service stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that end a supervised run.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The run's context was cancelled.
    #[error("run cancelled: {0}")]
    Cancelled(CancelCause),

    /// A supervised task panicked.
    #[error("supervised task panicked: {0}")]
    TaskPanicked(String),

    /// OS signal handlers could not be installed.
    #[error("failed to subscribe to OS signals: {0}")]
    SignalSetup(#[from] std::io::Error),
}

impl SupervisorError {
    /// The cancellation cause, when the run ended by cancellation.
    pub fn cause(&self) -> Option<&CancelCause> {
        match self {
            SupervisorError::Cancelled(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Supervisor tuning.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Deadline for each service start.
    pub startup_timeout: Duration,
    /// Deadline for each service stop.
    pub stop_timeout: Duration,
    /// Subscribe to OS termination signals.
    pub os_signals: bool,
    /// Reaction to a second signal.
    pub escalation: EscalationPolicy,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            os_signals: true,
            escalation: EscalationPolicy::ForceExit,
        }
    }
}

impl From<&SupervisorConfig> for SupervisorSettings {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            startup_timeout: Duration::from_secs(config.startup_timeout_secs),
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
            os_signals: true,
            escalation: if config.force_exit_on_second_signal {
                EscalationPolicy::ForceExit
            } else {
                EscalationPolicy::Ignore
            },
        }
    }
}

/// Owner of the signal channel and the current run's process group.
#[derive(Debug)]
pub struct SupervisorRuntime {
    settings: SupervisorSettings,
    group: Option<ProcessGroup>,
    signals: Option<SignalChannel>,
    listener: Option<JoinHandle<()>>,
}

impl SupervisorRuntime {
    pub fn new(settings: SupervisorSettings) -> Self {
        Self {
            settings,
            group: None,
            signals: None,
            listener: None,
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Create the signal channel if absent, otherwise reuse it.
    ///
    /// Must be called from within a Tokio runtime when OS signals are enabled.
    pub fn ensure_initialized(&mut self) -> Result<&mut SignalChannel, SupervisorError> {
        let channel = self.signals.get_or_insert_with(SignalChannel::new);
        if self.settings.os_signals {
            channel.forward_os_signals()?;
        }
        Ok(channel)
    }

    /// Sender into the signal channel.
    pub fn signal_sender(&mut self) -> Result<mpsc::Sender<ShutdownSignal>, SupervisorError> {
        Ok(self.ensure_initialized()?.sender())
    }

    /// Start a new run: fresh context, re-armed group, new signal listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn initialize(&mut self) -> Result<(ExecutionContext, CancelHandle), SupervisorError> {
        let escalation = self.settings.escalation.clone();
        let (ctx, cancel) = ExecutionContext::init();

        let channel = self.ensure_initialized()?;
        let listener = channel.arm(cancel.clone(), escalation);
        if let Some(stale) = self.listener.replace(listener) {
            stale.abort();
        }
        self.group = Some(ProcessGroup::new(cancel.clone()));

        tracing::info!(exec_id = %ctx.exec_id(), "execution context initialized");
        Ok((ctx, cancel))
    }

    /// Start `services` in order and block until the run ends.
    ///
    /// Returns the first error of the run. Because the watcher reports the
    /// cancellation cause, a run that ends for any reason returns
    /// [`SupervisorError::Cancelled`]; the call only returns `Ok` if the
    /// group empties without cancellation, which cannot happen while the
    /// watcher is waiting.
    ///
    /// # Panics
    /// If [`SupervisorRuntime::initialize`] was not called for this run.
    pub async fn start_services(
        &mut self,
        ctx: &ExecutionContext,
        cancel: &CancelHandle,
        services: Vec<ServiceRef>,
    ) -> Result<(), SupervisorError> {
        let Some(mut group) = self.group.take() else {
            panic!("initialize must be called before start_services");
        };

        let watched = ctx.clone();
        group.spawn(ctx.scope(async move {
            watched.cancelled().await;
            let cause = watched.cause().cloned().unwrap_or(CancelCause::Requested);
            tracing::info!(cause = %cause, "context is done");
            Err(SupervisorError::Cancelled(cause))
        }));

        let mut started = startup::start_all(
            &mut group,
            ctx,
            cancel,
            services,
            self.settings.startup_timeout,
        )
        .await;

        tracing::info!(running = started.len(), "waiting for supervised tasks");
        let result = group.wait().await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "supervised run ended with error");
        }

        started.stop_all(self.settings.stop_timeout).await;
        result
    }
}

impl Default for SupervisorRuntime {
    fn default() -> Self {
        Self::new(SupervisorSettings::default())
    }
}

impl Drop for SupervisorRuntime {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
