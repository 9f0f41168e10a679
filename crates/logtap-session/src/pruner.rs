//! Background expiry sweeps.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::registry::SessionRegistry;

/// Periodic prune worker.
///
/// Runs [`SessionRegistry::prune`] on a fixed cadence until shut down.
/// Sweep failures are logged and the cadence continues; a failed sweep
/// never takes the worker down.
pub struct Pruner {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Pruner {
    /// Spawn the sweep task.
    #[must_use]
    pub fn spawn(registry: Arc<SessionRegistry>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => match registry.prune() {
                        Ok(summary) if summary.removed > 0 => {
                            tracing::debug!(removed = summary.removed, "pruned expired sessions");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("prune sweep failed: {e}"),
                    },
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the sweep task and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
