//! Background eviction of expired pending logins and authorization codes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::store::{ChallengeStore, CodeStore};

/// Counts of entries removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pending_logins: usize,
    pub auth_codes: usize,
}

/// Periodically purges expired entries from both stores.
#[derive(Clone)]
pub struct Sweeper {
    challenges: Arc<dyn ChallengeStore>,
    codes: Arc<dyn CodeStore>,
    interval: Duration,
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        codes: Arc<dyn CodeStore>,
        interval: Duration,
    ) -> Self {
        Self { challenges, codes, interval }
    }

    /// Run one pass over both stores.
    pub async fn sweep(&self) -> SweepReport {
        let report = SweepReport {
            pending_logins: self.challenges.purge_expired().await,
            auth_codes: self.codes.purge_expired().await,
        };

        if report != SweepReport::default() {
            tracing::debug!(
                pending_logins = report.pending_logins,
                auth_codes = report.auth_codes,
                "Swept expired entries"
            );
        }

        report
    }

    /// Spawn the periodic sweep. Runs until [`SweeperHandle::shutdown`].
    #[must_use]
    pub fn start(self) -> SweeperHandle {
        let (shutdown, mut stop) = watch::channel(false);
        let interval_secs = self.interval.as_secs();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.sweep().await;
                    }
                    _ = stop.changed() => break,
                }
            }
            tracing::debug!("Sweeper stopped");
        });

        tracing::info!(interval_secs, "Sweeper started");
        SweeperHandle { shutdown, task }
    }
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Sweeper task ended abnormally");
        }
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper").field("interval", &self.interval).finish()
    }
}
