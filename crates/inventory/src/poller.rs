//! Driver loop that keeps the inventory in step with the device.

use crate::engine::InventoryEngine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RefreshLoopConfig {
    /// Pause between cycles. Zero polls back to back.
    pub min_interval: Duration,
    /// Extra pause after a failed cycle.
    pub retry_delay: Duration,
}

impl Default for RefreshLoopConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    changes: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RefreshStats {
        RefreshStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            changes: self.changes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStats {
    pub cycles: u64,
    pub changes: u64,
    pub failures: u64,
}

pub struct RefreshLoop {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl RefreshLoop {
    pub fn spawn(engine: Arc<InventoryEngine>, config: RefreshLoopConfig) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let counters = Arc::new(Counters::default());
        let task_counters = Arc::clone(&counters);

        let handle = tokio::spawn(async move {
            tracing::info!("Refresh loop started");
            loop {
                if *stopped.borrow() {
                    break;
                }

                let pause = match engine.refresh().await {
                    Ok(report) => {
                        task_counters.cycles.fetch_add(1, Ordering::Relaxed);
                        if report.changed() {
                            task_counters.changes.fetch_add(1, Ordering::Relaxed);
                        } else {
                            tracing::debug!("Inventory unchanged");
                        }
                        config.min_interval
                    }
                    Err(e) => {
                        task_counters.cycles.fetch_add(1, Ordering::Relaxed);
                        task_counters.failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("Refresh failed, retrying next cycle: {}", e);
                        config.min_interval + config.retry_delay
                    }
                };

                if pause.is_zero() {
                    tokio::task::yield_now().await;
                    continue;
                }

                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    changed = stopped.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Refresh loop stopped");
        });

        Self {
            stop,
            handle,
            counters,
        }
    }

    pub fn stats(&self) -> RefreshStats {
        self.counters.snapshot()
    }

    /// Stops after the cycle in progress, waits for the task to finish and
    /// returns the final counters.
    pub async fn stop(self) -> RefreshStats {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::warn!("Refresh loop ended abnormally: {}", e);
            }
        }
        self.counters.snapshot()
    }
}
