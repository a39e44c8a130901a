//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGHUP, SIGINT, SIGTERM, SIGQUIT
//! - Forward received signals into the process-wide signal channel
//! - Cancel the run on the first signal
//! - Escalate on a second signal that arrives before the run is torn down
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The channel has capacity 1 and outlives runs; each run arms one listener
//! - A second signal forces exit by default

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::lifecycle::context::{CancelCause, CancelHandle};

/// A termination signal understood by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    Hangup,
    Interrupt,
    Terminate,
    Quit,
}

impl ShutdownSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Hangup => "SIGHUP",
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
        }
    }

    /// POSIX signal number.
    pub fn number(&self) -> i32 {
        match self {
            ShutdownSignal::Hangup => 1,
            ShutdownSignal::Interrupt => 2,
            ShutdownSignal::Quit => 3,
            ShutdownSignal::Terminate => 15,
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when a second signal arrives while the run is shutting down.
#[derive(Clone, Default)]
pub enum EscalationPolicy {
    /// Exit the process immediately with status `128 + signo`.
    #[default]
    ForceExit,
    /// Log the signal and keep shutting down.
    Ignore,
    /// Hand the signal to a callback.
    Hook(Arc<dyn Fn(ShutdownSignal) + Send + Sync>),
}

impl EscalationPolicy {
    fn escalate(&self, signal: ShutdownSignal) {
        match self {
            EscalationPolicy::ForceExit => {
                tracing::warn!(signal = %signal, "second signal received, forcing exit");
                std::process::exit(128 + signal.number());
            }
            EscalationPolicy::Ignore => {
                tracing::warn!(signal = %signal, "second signal received, shutdown already in progress");
            }
            EscalationPolicy::Hook(hook) => {
                tracing::warn!(signal = %signal, "second signal received, escalating");
                hook(signal);
            }
        }
    }
}

impl fmt::Debug for EscalationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationPolicy::ForceExit => f.write_str("ForceExit"),
            EscalationPolicy::Ignore => f.write_str("Ignore"),
            EscalationPolicy::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// Process-wide buffered signal channel (capacity 1).
#[derive(Debug)]
pub struct SignalChannel {
    tx: mpsc::Sender<ShutdownSignal>,
    rx: Arc<Mutex<mpsc::Receiver<ShutdownSignal>>>,
    forwarder: Option<JoinHandle<()>>,
}

impl SignalChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            forwarder: None,
        }
    }

    /// Sender side of the channel, for injecting signals.
    pub fn sender(&self) -> mpsc::Sender<ShutdownSignal> {
        self.tx.clone()
    }

    /// Subscribe to OS termination signals and forward them into the channel.
    ///
    /// Registration happens before this returns, so a signal that arrives
    /// afterwards is never lost. Calling it again is a no-op.
    pub fn forward_os_signals(&mut self) -> std::io::Result<()> {
        if self.forwarder.is_none() {
            self.forwarder = Some(spawn_os_forwarder(self.tx.clone())?);
        }
        Ok(())
    }

    /// Arm a listener for one run.
    ///
    /// On the first signal the run is cancelled; any further signal is
    /// handed to `policy`. The listener holds the receiver until it is
    /// aborted, so only one listener drains the channel at a time.
    pub fn arm(&self, cancel: CancelHandle, policy: EscalationPolicy) -> JoinHandle<()> {
        let rx = Arc::clone(&self.rx);
        tokio::spawn(async move {
            let mut rx = rx.lock().await;

            let Some(signal) = rx.recv().await else {
                return;
            };
            tracing::info!(signal = %signal, "received signal");
            cancel.cancel(CancelCause::Signal(signal));

            while let Some(signal) = rx.recv().await {
                policy.escalate(signal);
            }
        })
    }
}

impl Default for SignalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SignalChannel {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

#[cfg(unix)]
fn spawn_os_forwarder(tx: mpsc::Sender<ShutdownSignal>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = sighup.recv() => ShutdownSignal::Hangup,
                _ = sigint.recv() => ShutdownSignal::Interrupt,
                _ = sigterm.recv() => ShutdownSignal::Terminate,
                _ = sigquit.recv() => ShutdownSignal::Quit,
            };
            if tx.send(received).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
fn spawn_os_forwarder(tx: mpsc::Sender<ShutdownSignal>) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(ShutdownSignal::Interrupt).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::context::ExecutionContext;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_signal_names() {
        assert_eq!(ShutdownSignal::Hangup.to_string(), "SIGHUP");
        assert_eq!(ShutdownSignal::Quit.as_str(), "SIGQUIT");
        assert_eq!(ShutdownSignal::Terminate.number(), 15);
    }

    #[tokio::test]
    async fn test_first_signal_cancels_run() {
        let channel = SignalChannel::new();
        let (ctx, cancel) = ExecutionContext::init();
        let _listener = channel.arm(cancel, EscalationPolicy::Ignore);

        channel.sender().send(ShutdownSignal::Terminate).await.unwrap();
        ctx.cancelled().await;

        assert_eq!(ctx.cause(), Some(&CancelCause::Signal(ShutdownSignal::Terminate)));
    }

    #[tokio::test]
    async fn test_second_signal_escalates() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let (done_tx, mut done_rx) = mpsc::channel(1);
        let hook = {
            let seen = Arc::clone(&seen);
            EscalationPolicy::Hook(Arc::new(move |sig| {
                seen.lock().unwrap().push(sig);
                let _ = done_tx.try_send(());
            }))
        };

        let channel = SignalChannel::new();
        let (ctx, cancel) = ExecutionContext::init();
        let _listener = channel.arm(cancel, hook);

        let tx = channel.sender();
        tx.send(ShutdownSignal::Interrupt).await.unwrap();
        ctx.cancelled().await;
        tx.send(ShutdownSignal::Quit).await.unwrap();
        done_rx.recv().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![ShutdownSignal::Quit]);
        assert_eq!(ctx.cause(), Some(&CancelCause::Signal(ShutdownSignal::Interrupt)));
    }

    #[tokio::test]
    async fn test_rearm_after_abort_reuses_channel() {
        let channel = SignalChannel::new();

        let (first, cancel) = ExecutionContext::init();
        let listener = channel.arm(cancel, EscalationPolicy::Ignore);
        listener.abort();
        let _ = listener.await;

        let (second, cancel) = ExecutionContext::init();
        let _listener = channel.arm(cancel, EscalationPolicy::Ignore);
        channel.sender().send(ShutdownSignal::Hangup).await.unwrap();
        second.cancelled().await;

        assert!(!first.is_cancelled());
    }
}
