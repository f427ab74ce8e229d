use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pool::PoolShared;

/// Bridges the host's termination signal to [`kill_all`](crate::Pool::kill_all).
///
/// Owned by the pool. The subscription is never torn down while the pool is
/// alive; the token exists so a future owner can cancel it.
pub(crate) struct SignalBridge {
    #[allow(dead_code)]
    token: CancellationToken,
    #[allow(dead_code)]
    task: JoinHandle<()>,
}

impl SignalBridge {
    pub(crate) fn subscribe(pool: Arc<PoolShared>) -> Self {
        let token = CancellationToken::new();
        let bridge_token = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = bridge_token.cancelled() => {}
                _ = relay_terminations(pool) => {}
            }
        });
        Self { token, task }
    }
}

#[cfg(unix)]
async fn relay_terminations(pool: Arc<PoolShared>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            tracing::warn!(error = %err, "failed to subscribe to SIGTERM");
            return;
        }
    };
    while sigterm.recv().await.is_some() {
        debug!("SIGTERM received, killing all processes");
        pool.kill_all();
    }
}

#[cfg(not(unix))]
async fn relay_terminations(pool: Arc<PoolShared>) {
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        debug!("termination signal received, killing all processes");
        pool.kill_all();
    }
}
