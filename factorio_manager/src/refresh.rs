//! Periodic panel refresh.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::panel::PanelManager;

/// Background task that keeps the panel current.
///
/// Cancellation is only observed between cycles, so a refresh that already
/// started always finishes its edit.
pub struct RefreshLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshLoop {
    /// Starts ticking after one full `interval`; the caller reconciles the
    /// panel itself before spawning the loop.
    pub fn spawn(manager: Arc<PanelManager>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = interval.as_secs(), "status refresh loop started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => manager.tick().await,
                }
            }
            tracing::info!("status refresh loop stopped");
        });
        Self { cancel, task }
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "status refresh loop panicked");
        }
    }
}
