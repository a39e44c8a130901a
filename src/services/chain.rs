//! Chain head monitor service.
//!
//! `start` fails if the RPC endpoint is unreachable or serves the wrong
//! chain, which cancels the run. Once started, the head is polled on an
//! interval; poll errors are logged and the loop keeps going.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::blockchain::BlockchainClient;
use crate::lifecycle::ExecutionContext;
use crate::observability::metrics;
use crate::services::{Service, ServiceError};

const SERVICE_NAME: &str = "chain-monitor";

/// Polls the chain head and exports it as a metric.
pub struct ChainMonitor {
    client: BlockchainClient,
    poll_interval: Duration,
    token: CancellationToken,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl ChainMonitor {
    pub fn new(client: BlockchainClient, ctx: &ExecutionContext) -> Self {
        let poll_interval = Duration::from_millis(client.config().poll_interval_ms);
        Self {
            client,
            poll_interval,
            token: ctx.child_token(),
            poller: Mutex::new(None),
        }
    }
}

async fn poll_head(client: BlockchainClient, every: Duration, token: CancellationToken) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => match client.get_block_number().await {
                Ok(block) => {
                    metrics::record_chain_head(block);
                    metrics::record_rpc_health(true);
                    tracing::debug!(block, "chain head");
                }
                Err(e) => {
                    metrics::record_rpc_health(false);
                    tracing::warn!(error = %e, "Error polling chain head");
                }
            },
        }
    }
}

#[async_trait]
impl Service for ChainMonitor {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.client.verify_chain_id().await?;
        tracing::info!(
            chain_id = self.client.config().chain_id,
            rpc_url = %self.client.config().rpc_url,
            "Connected to chain"
        );

        let poller = tokio::spawn(poll_head(
            self.client.clone(),
            self.poll_interval,
            self.token.clone(),
        ));
        *self.poller.lock().await = Some(poller);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.token.cancel();
        if let Some(poller) = self.poller.lock().await.take() {
            poller.await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;

    fn unreachable() -> BlockchainClient {
        BlockchainClient::new(ChainConfig {
            enabled: true,
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 1,
            poll_interval_ms: 10,
            ..ChainConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_fails_when_rpc_unreachable() {
        let (ctx, _cancel) = ExecutionContext::init();
        let monitor = ChainMonitor::new(unreachable(), &ctx);
        assert!(monitor.start().await.is_err());
        // Stop without a running poller is a no-op.
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_poller_exits_on_cancel() {
        let token = CancellationToken::new();
        let poller = tokio::spawn(poll_head(
            unreachable(),
            Duration::from_millis(10),
            token.clone(),
        ));
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), poller)
            .await
            .unwrap()
            .unwrap();
    }
}
