// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{Config, RestartConfig};
use crate::reconcile::Reconciler;
use crate::restart::restart_containers;

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Represents the set of background tasks of the service
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `duration` unless a shutdown is requested first.
///
/// Returns whether the daemon is still running.
async fn pause(running: &AtomicBool, wake: &Notify, duration: Duration) -> bool {
    let notified = wake.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if !running.load(Ordering::SeqCst) {
        return false;
    }
    tokio::select! {
        _ = time::sleep(duration) => {}
        _ = notified => {}
    }
    running.load(Ordering::SeqCst)
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Launch all configured tasks based on configuration
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let reconciler = Reconciler::from_config(config)?;
        let restart = config.restart.enabled.then(|| config.restart.clone());

        self.start_poller(
            reconciler,
            restart,
            Duration::from_secs(config.daemon.interval_seconds),
        )?;

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Start the reconciliation loop
    pub fn start_poller(
        &mut self,
        mut reconciler: Reconciler,
        restart: Option<RestartConfig>,
        interval: Duration,
    ) -> Result<()> {
        info!(
            "Starting recipe poller, one cycle every {} s",
            interval.as_secs()
        );

        let running = self.running.clone();
        let wake = self.wake.clone();
        let task = tokio::spawn(async move {
            if let Some(restart) = restart {
                if let Err(e) = restart_containers(&restart).await {
                    warn!("Container restart failed, continuing: {:#}", e);
                }
                info!(
                    "Waiting {} s for the signage containers",
                    restart.wait_seconds
                );
                if !pause(&running, &wake, Duration::from_secs(restart.wait_seconds)).await {
                    return Ok(());
                }
            }

            while running.load(Ordering::SeqCst) {
                match reconciler.run_cycle().await {
                    Ok(report) => debug!("Cycle report: {}", report.summary()),
                    Err(e) => error!("Reconciliation cycle failed: {:#}", e),
                }
                if !pause(&running, &wake, interval).await {
                    break;
                }
            }
            info!("Recipe poller stopped");
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let wake = self.wake.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!("Daemon heartbeat: running");
                if !pause(&running, &wake, HEARTBEAT_PERIOD).await {
                    break;
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop all running tasks; sleeping tasks are woken immediately
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::reconcile::ReconcileOptions;
    use crate::signage::{MockSignageApi, SignageError};
    use std::sync::atomic::AtomicUsize;

    fn counting_reconciler(cycles: Arc<AtomicUsize>) -> Reconciler {
        let mut signage = MockSignageApi::new();
        signage.expect_authenticate().returning(move || {
            cycles.fetch_add(1, Ordering::SeqCst);
            Err(SignageError::NotAuthenticated)
        });
        Reconciler::new(
            Vec::new(),
            Box::new(MemoryStore::new()),
            Box::new(signage),
            ReconcileOptions::default(),
        )
    }

    async fn wait_for(cycles: &AtomicUsize, count: usize) {
        time::timeout(Duration::from_secs(5), async {
            while cycles.load(Ordering::SeqCst) < count {
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_cycles_do_not_stop_the_poller() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let mut daemon = Daemon::new();
        daemon
            .start_poller(
                counting_reconciler(cycles.clone()),
                None,
                Duration::from_millis(10),
            )
            .unwrap();

        wait_for(&cycles, 3).await;
        assert!(daemon.is_running());

        daemon.shutdown();
        time::timeout(Duration::from_secs(5), daemon.join())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_interrupts_long_sleep() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let mut daemon = Daemon::new();
        daemon
            .start_poller(
                counting_reconciler(cycles.clone()),
                None,
                Duration::from_secs(3600),
            )
            .unwrap();
        daemon.start_heartbeat().unwrap();

        wait_for(&cycles, 1).await;
        daemon.shutdown();
        time::timeout(Duration::from_secs(5), daemon.join())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cycles.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_restart_does_not_block_polling() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let restart = RestartConfig {
            enabled: true,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 1".to_string()],
            wait_seconds: 0,
        };
        let mut daemon = Daemon::new();
        daemon
            .start_poller(
                counting_reconciler(cycles.clone()),
                Some(restart),
                Duration::from_secs(3600),
            )
            .unwrap();

        wait_for(&cycles, 1).await;
        daemon.shutdown();
        daemon.join().await.unwrap();
    }
}
