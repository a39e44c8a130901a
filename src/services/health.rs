//! HTTP health endpoint.
//!
//! Serves `GET /health` for the lifetime of a run. The server shuts down
//! gracefully on `stop` or when the run is cancelled, whichever comes first.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::HealthConfig;
use crate::lifecycle::ExecutionContext;
use crate::services::{Service, ServiceError};

const SERVICE_NAME: &str = "health";

#[derive(Clone)]
struct HealthState {
    exec_id: String,
    container: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    exec_id: String,
    container: String,
}

async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    Json(HealthBody {
        status: "ok",
        exec_id: state.exec_id,
        container: state.container,
    })
}

struct Running {
    addr: SocketAddr,
    server: JoinHandle<Result<(), std::io::Error>>,
}

/// Health endpoint service.
pub struct HealthServer {
    config: HealthConfig,
    state: HealthState,
    token: CancellationToken,
    running: Mutex<Option<Running>>,
}

impl HealthServer {
    pub fn new(config: HealthConfig, container: impl Into<String>, ctx: &ExecutionContext) -> Self {
        Self {
            config,
            state: HealthState {
                exec_id: ctx.exec_id().to_string(),
                container: container.into(),
            },
            token: ctx.child_token(),
            running: Mutex::new(None),
        }
    }

    /// Address the server is bound to, once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.addr)
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }
}

#[async_trait]
impl Service for HealthServer {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Health endpoint listening");

        let app = self.router();
        let token = self.token.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        });

        *self.running.lock().await = Some(Running { addr, server });
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.token.cancel();
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        running.server.await??;
        tracing::info!("Health endpoint stopped");
        Ok(())
    }
}
