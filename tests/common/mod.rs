//! Shared fixtures for supervisor integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use node_supervisor::lifecycle::{EscalationPolicy, SupervisorSettings};
use node_supervisor::services::{Service, ServiceError, ServiceRef};

/// Ordered record of lifecycle calls, e.g. `"start:a"`, `"stop:a"`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries with the given prefix, prefix stripped.
    #[allow(dead_code)]
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }
}

/// How a scripted service behaves in `start`.
#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum StartBehavior {
    Ok,
    Fail,
    Delay(Duration),
    Hang,
}

/// Service whose start/stop behavior is scripted and journaled.
pub struct ScriptedService {
    name: String,
    journal: Journal,
    start: StartBehavior,
    stop_delay: Duration,
    fail_stop: bool,
}

impl ScriptedService {
    pub fn new(name: &str, journal: &Journal, start: StartBehavior) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            start,
            stop_delay: Duration::ZERO,
            fail_stop: false,
        }
    }

    #[allow(dead_code)]
    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    #[allow(dead_code)]
    pub fn fail_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn shared(self) -> ServiceRef {
        Arc::new(self)
    }
}

#[async_trait]
impl Service for ScriptedService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.journal.record(format!("start:{}", self.name));
        match self.start {
            StartBehavior::Ok => Ok(()),
            StartBehavior::Fail => Err(format!("{} refused to start", self.name).into()),
            StartBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            StartBehavior::Hang => std::future::pending().await,
        }
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.journal.record(format!("stop:{}", self.name));
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }
        if self.fail_stop {
            return Err(format!("{} failed to stop", self.name).into());
        }
        Ok(())
    }
}

/// Settings for tests: no OS signal handlers, second signal ignored.
pub fn test_settings() -> SupervisorSettings {
    SupervisorSettings {
        os_signals: false,
        escalation: EscalationPolicy::Ignore,
        ..SupervisorSettings::default()
    }
}
