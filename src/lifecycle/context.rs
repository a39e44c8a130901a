//! Execution context for one supervised run.
//!
//! An [`ExecutionContext`] couples a cancellation token with the run's
//! [`ExecId`]. The only way to build one is [`ExecutionContext::init`], so a
//! context without an ID cannot exist. Code that is not handed the context
//! can still read the ID through [`current_exec_id`] while it runs inside a
//! supervised task.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::lifecycle::signals::ShutdownSignal;
use crate::observability::metrics;

tokio::task_local! {
    static EXEC_ID: ExecId;
}

/// Unique identifier of one process run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecId(Arc<str>);

impl ExecId {
    fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a run was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCause {
    /// An OS termination signal arrived.
    Signal(ShutdownSignal),
    /// A service's start returned an error.
    StartFailed { service: String, error: String },
    /// A service did not report started before the deadline.
    StartTimeout { service: String, timeout: Duration },
    /// A supervised task failed.
    TaskFailed { error: String },
    /// Cancelled explicitly by the owner of the run.
    Requested,
}

impl CancelCause {
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelCause::Signal(_) => "signal",
            CancelCause::StartFailed { .. } => "start_failed",
            CancelCause::StartTimeout { .. } => "start_timeout",
            CancelCause::TaskFailed { .. } => "task_failed",
            CancelCause::Requested => "requested",
        }
    }
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Signal(sig) => write!(f, "received signal {sig}"),
            CancelCause::StartFailed { service, error } => {
                write!(f, "service '{service}' failed to start: {error}")
            }
            CancelCause::StartTimeout { service, timeout } => {
                write!(f, "service '{service}' did not start within {timeout:?}")
            }
            CancelCause::TaskFailed { error } => write!(f, "supervised task failed: {error}"),
            CancelCause::Requested => f.write_str("cancellation requested"),
        }
    }
}

/// Shared cancellation state: token plus the first recorded cause.
#[derive(Debug, Default)]
struct CancelState {
    token: CancellationToken,
    cause: OnceLock<CancelCause>,
}

/// The cancellation function of a run.
///
/// Cancelling is idempotent: only the first call records its cause and
/// triggers the token, later calls are no-ops.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Cancel the run. Returns `true` if this call was the one that cancelled it.
    pub fn cancel(&self, cause: CancelCause) -> bool {
        let label = cause.as_label();
        let first = self.state.cause.set(cause).is_ok();
        // The token is cancelled on every call, so `false` implies `is_cancelled()`.
        self.state.token.cancel();
        if !first {
            tracing::debug!(cause = label, "run already cancelled");
            return false;
        }
        metrics::record_cancellation(label);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.token.is_cancelled()
    }
}

/// Cancellable context of one supervised run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    exec_id: ExecId,
    state: Arc<CancelState>,
}

impl ExecutionContext {
    /// Create a fresh context with a new execution ID.
    pub fn init() -> (Self, CancelHandle) {
        let state = Arc::new(CancelState::default());
        let ctx = Self {
            exec_id: ExecId::generate(),
            state: Arc::clone(&state),
        };
        (ctx, CancelHandle { state })
    }

    pub fn exec_id(&self) -> &ExecId {
        &self.exec_id
    }

    /// Returns a cancel handle for this context.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            state: Arc::clone(&self.state),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.token.is_cancelled()
    }

    /// The cause recorded by the first cancellation, if any.
    pub fn cause(&self) -> Option<&CancelCause> {
        self.state.cause.get()
    }

    /// Completes once the run is cancelled.
    pub async fn cancelled(&self) {
        self.state.token.cancelled().await
    }

    /// A token that is cancelled with the run but can also be cancelled on
    /// its own, for services that need a private shutdown switch.
    pub fn child_token(&self) -> CancellationToken {
        self.state.token.child_token()
    }

    /// Run `fut` with this context's execution ID visible to [`current_exec_id`].
    pub fn scope<F: Future>(&self, fut: F) -> impl Future<Output = F::Output> {
        EXEC_ID.scope(self.exec_id.clone(), fut)
    }
}

/// Read the execution ID of the supervised task running this code.
///
/// # Panics
/// When called outside [`ExecutionContext::scope`]. That is a programming
/// error: the ID only exists inside a supervised run.
pub fn current_exec_id() -> ExecId {
    EXEC_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| panic!("cannot get exec ID: not inside a supervised run"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_ids_are_unique() {
        let (a, _) = ExecutionContext::init();
        let (b, _) = ExecutionContext::init();
        assert_ne!(a.exec_id(), b.exec_id());
        assert!(Uuid::parse_str(a.exec_id().as_str()).is_ok());
    }

    #[test]
    fn test_clones_share_id_and_cancellation() {
        let (ctx, cancel) = ExecutionContext::init();
        let clone = ctx.clone();
        assert_eq!(clone.exec_id(), ctx.exec_id());

        assert!(cancel.cancel(CancelCause::Requested));
        assert!(clone.is_cancelled());
        assert_eq!(clone.cause(), Some(&CancelCause::Requested));
    }

    #[test]
    fn test_cancel_is_idempotent_first_cause_wins() {
        let (ctx, cancel) = ExecutionContext::init();
        assert!(cancel.cancel(CancelCause::Signal(ShutdownSignal::Terminate)));
        assert!(!cancel.cancel(CancelCause::Requested));
        assert!(!ctx.cancel_handle().cancel(CancelCause::TaskFailed {
            error: "late".to_string()
        }));

        assert_eq!(ctx.cause(), Some(&CancelCause::Signal(ShutdownSignal::Terminate)));
    }

    #[test]
    fn test_child_token_follows_run() {
        let (ctx, cancel) = ExecutionContext::init();
        let child = ctx.child_token();
        child.cancel();
        assert!(!ctx.is_cancelled());

        let child = ctx.child_token();
        cancel.cancel(CancelCause::Requested);
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_scope_exposes_exec_id() {
        let (ctx, _) = ExecutionContext::init();
        let seen = ctx.scope(async { current_exec_id() }).await;
        assert_eq!(&seen, ctx.exec_id());
    }

    #[test]
    #[should_panic(expected = "cannot get exec ID")]
    fn test_exec_id_outside_run_panics() {
        let _ = current_exec_id();
    }

    #[test]
    fn test_cause_display() {
        let cause = CancelCause::StartTimeout {
            service: "scanner".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(cause.to_string(), "service 'scanner' did not start within 60s");
        assert_eq!(
            CancelCause::Signal(ShutdownSignal::Interrupt).to_string(),
            "received signal SIGINT"
        );
    }

    #[test]
    fn test_losing_cancel_sees_cancelled_run() {
        for _ in 0..100 {
            let (ctx, cancel) = ExecutionContext::init();
            let racers: Vec<_> = (0..4)
                .map(|_| {
                    let cancel = cancel.clone();
                    std::thread::spawn(move || {
                        let won = cancel.cancel(CancelCause::Requested);
                        (won, cancel.is_cancelled())
                    })
                })
                .collect();

            let results: Vec<_> = racers.into_iter().map(|r| r.join().unwrap()).collect();
            assert_eq!(results.iter().filter(|(won, _)| *won).count(), 1);
            assert!(results.iter().all(|(_, cancelled)| *cancelled));
            assert!(ctx.is_cancelled());
        }
    }
}
