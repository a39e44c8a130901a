//! Shutdown coordination for supervised services.
//!
//! Services that reported started are pushed on a stack; at the end of the
//! run the stack is popped, so the last service started is the first one
//! stopped. Each stop runs exactly once and is bounded by the stop timeout.

use std::time::Duration;

use crate::observability::metrics;
use crate::services::ServiceRef;

/// Services that started successfully, in start order.
#[derive(Default)]
pub struct StartedServices {
    stack: Vec<ServiceRef>,
}

impl StartedServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a started service.
    pub fn push(&mut self, service: ServiceRef) {
        self.stack.push(service);
        metrics::set_running_services(self.stack.len());
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Names in start order.
    pub fn names(&self) -> Vec<&str> {
        self.stack.iter().map(|s| s.name()).collect()
    }

    /// Stop every service, most recently started first.
    ///
    /// Stop errors and timeouts are logged and never interrupt the sequence.
    pub async fn stop_all(&mut self, timeout: Duration) {
        while let Some(service) = self.stack.pop() {
            stop_one(&service, timeout).await;
            metrics::set_running_services(self.stack.len());
        }
    }
}

impl std::fmt::Debug for StartedServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

async fn stop_one(service: &ServiceRef, timeout: Duration) {
    let ok = match tokio::time::timeout(timeout, service.stop()).await {
        Ok(Ok(())) => {
            tracing::info!(service = %service.name(), "service stopped");
            true
        }
        Ok(Err(err)) => {
            tracing::error!(service = %service.name(), error = %err, "error while stopping");
            false
        }
        Err(_) => {
            tracing::error!(service = %service.name(), timeout = ?timeout, "service stop timed out");
            false
        }
    };
    metrics::record_service_stop(service.name(), ok);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Service, ServiceError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        stop: Result<(), &'static str>,
        hang: bool,
    }

    #[async_trait]
    impl Service for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), ServiceError> {
            self.log.lock().unwrap().push(self.name);
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.stop.map_err(Into::into)
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        stop: Result<(), &'static str>,
        hang: bool,
    ) -> ServiceRef {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            stop,
            hang,
        })
    }

    #[tokio::test]
    async fn test_stops_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut started = StartedServices::new();
        for name in ["a", "b", "c"] {
            started.push(recorder(name, &log, Ok(()), false));
        }
        assert_eq!(started.names(), vec!["a", "b", "c"]);

        started.stop_all(Duration::from_secs(1)).await;

        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
        assert!(started.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_and_timeouts_do_not_interrupt() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut started = StartedServices::new();
        started.push(recorder("a", &log, Ok(()), false));
        started.push(recorder("b", &log, Ok(()), true));
        started.push(recorder("c", &log, Err("disk full"), false));

        started.stop_all(Duration::from_secs(5)).await;
        // Stopping twice is a no-op: each service is stopped once.
        started.stop_all(Duration::from_secs(5)).await;

        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
    }
}
