//! Startup orchestration.
//!
//! # Responsibilities
//! - Start services in the order they were given
//! - Bound each start by the startup deadline
//! - Turn a failed or late start into cancellation of the whole run
//!
//! # Design Decisions
//! - Sequential: service `i + 1` is launched only after service `i` reported
//!   started or its deadline passed. A failed start still holds the launcher
//!   until the deadline
//! - Each `start` runs on its own detached task in the process group, so a
//!   hung start stalls the launcher for at most one deadline
//! - Cancellation does not stop the launcher: every service is started, and
//!   every service that wins its race is stopped at the end of the run

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{sleep_until, timeout_at, Instant};

use crate::lifecycle::context::{CancelCause, CancelHandle, ExecutionContext};
use crate::lifecycle::group::ProcessGroup;
use crate::lifecycle::shutdown::StartedServices;
use crate::observability::metrics;
use crate::services::ServiceRef;

/// Result of launching one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// `start` returned `Ok` before the deadline.
    Started,
    /// `start` returned an error or panicked.
    Failed,
    /// The deadline passed first.
    TimedOut,
}

impl StartOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            StartOutcome::Started => "started",
            StartOutcome::Failed => "failed",
            StartOutcome::TimedOut => "timed_out",
        }
    }
}

/// Launch every service in order and collect the ones that started.
pub async fn start_all(
    group: &mut ProcessGroup,
    ctx: &ExecutionContext,
    cancel: &CancelHandle,
    services: Vec<ServiceRef>,
    deadline: Duration,
) -> StartedServices {
    let mut started = StartedServices::new();

    for service in services {
        let outcome = launch(group, ctx, cancel, &service, deadline).await;

        metrics::record_service_start(service.name(), outcome.as_label());
        if outcome == StartOutcome::Started {
            tracing::info!(service = %service.name(), "service started");
            started.push(service);
        }
    }

    started
}

/// Start one service and race it against `deadline`.
pub async fn launch(
    group: &mut ProcessGroup,
    ctx: &ExecutionContext,
    cancel: &CancelHandle,
    service: &ServiceRef,
    deadline: Duration,
) -> StartOutcome {
    let name = service.name().to_string();
    let (started_tx, started_rx) = oneshot::channel::<()>();

    let task_service = Arc::clone(service);
    let task_cancel = cancel.clone();
    group.spawn_detached(
        name.clone(),
        ctx.scope(async move {
            match task_service.start().await {
                Ok(()) => {
                    if started_tx.send(()).is_err() {
                        tracing::warn!(
                            service = %task_service.name(),
                            "service started after its deadline, ignoring"
                        );
                    }
                }
                Err(err) => {
                    tracing::error!(service = %task_service.name(), error = %err, "failed to start service");
                    task_cancel.cancel(CancelCause::StartFailed {
                        service: task_service.name().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }),
    );

    let deadline_at = Instant::now() + deadline;
    match timeout_at(deadline_at, started_rx).await {
        Ok(Ok(())) => StartOutcome::Started,
        Ok(Err(_)) => {
            // An `Err` from start cancels before the sender drops; a panic does not.
            if cancel.cancel(CancelCause::StartFailed {
                service: name.clone(),
                error: "start task panicked".to_string(),
            }) {
                tracing::error!(service = %name, "service start task panicked");
            }
            sleep_until(deadline_at).await;
            StartOutcome::Failed
        }
        Err(_) => {
            tracing::error!(service = %name, timeout = ?deadline, "service did not start in time");
            cancel.cancel(CancelCause::StartTimeout {
                service: name,
                timeout: deadline,
            });
            StartOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Service, ServiceError};
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl Service for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<(), ServiceError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err("refused".into());
            }
            Ok(())
        }

        async fn stop(&self) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    struct Panicky;

    #[async_trait]
    impl Service for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn start(&self) -> Result<(), ServiceError> {
            panic!("start blew up");
        }

        async fn stop(&self) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    fn service(name: &'static str, fail: bool, delay: Duration) -> ServiceRef {
        Arc::new(Fixed { name, fail, delay })
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_started() {
        let (ctx, cancel) = ExecutionContext::init();
        let mut group = ProcessGroup::new(cancel.clone());
        let svc = service("a", false, Duration::from_secs(1));

        let outcome = launch(&mut group, &ctx, &cancel, &svc, Duration::from_secs(60)).await;
        assert_eq!(outcome, StartOutcome::Started);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failed_cancels_run_and_holds_until_deadline() {
        let (ctx, cancel) = ExecutionContext::init();
        let mut group = ProcessGroup::new(cancel.clone());
        let svc = service("a", true, Duration::ZERO);

        let before = Instant::now();
        let outcome = launch(&mut group, &ctx, &cancel, &svc, Duration::from_secs(60)).await;

        assert_eq!(outcome, StartOutcome::Failed);
        assert!(before.elapsed() >= Duration::from_secs(60));
        assert_eq!(
            ctx.cause(),
            Some(&CancelCause::StartFailed {
                service: "a".to_string(),
                error: "refused".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_panicking_start_cancels_run() {
        let (ctx, cancel) = ExecutionContext::init();
        let mut group = ProcessGroup::new(cancel.clone());
        let svc: ServiceRef = Arc::new(Panicky);

        let outcome = launch(&mut group, &ctx, &cancel, &svc, Duration::from_secs(60)).await;

        assert_eq!(outcome, StartOutcome::Failed);
        assert!(ctx.is_cancelled());
        assert_eq!(
            ctx.cause(),
            Some(&CancelCause::StartFailed {
                service: "panicky".to_string(),
                error: "start task panicked".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_timeout_cancels_run() {
        let (ctx, cancel) = ExecutionContext::init();
        let mut group = ProcessGroup::new(cancel.clone());
        let svc = service("slow", false, Duration::from_secs(120));

        let outcome = launch(&mut group, &ctx, &cancel, &svc, Duration::from_secs(60)).await;

        assert_eq!(outcome, StartOutcome::TimedOut);
        assert!(matches!(
            ctx.cause(),
            Some(CancelCause::StartTimeout { service, .. }) if service == "slow"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_all_keeps_starting_after_cancellation() {
        let (ctx, cancel) = ExecutionContext::init();
        let mut group = ProcessGroup::new(cancel.clone());
        let services = vec![
            service("a", false, Duration::ZERO),
            service("b", true, Duration::ZERO),
            service("c", false, Duration::ZERO),
        ];

        let started = start_all(&mut group, &ctx, &cancel, services, Duration::from_secs(60)).await;
        assert_eq!(started.names(), vec!["a", "c"]);
        assert!(ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_all_on_cancelled_run_starts_everything() {
        let (ctx, cancel) = ExecutionContext::init();
        let mut group = ProcessGroup::new(cancel.clone());
        cancel.cancel(CancelCause::Requested);

        let services = vec![
            service("a", false, Duration::ZERO),
            service("b", false, Duration::ZERO),
        ];
        let started = start_all(&mut group, &ctx, &cancel, services, Duration::from_secs(60)).await;

        assert_eq!(started.names(), vec!["a", "b"]);
        assert_eq!(ctx.cause(), Some(&CancelCause::Requested));
    }
}
