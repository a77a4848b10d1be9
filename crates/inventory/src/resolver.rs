//! Fixed pool of workers that resolve labels and metadata for new packages.

use crate::commands::PackageCommands;
use crate::error::InventoryError;
use crate::package::Package;
use droidsync_bridge::CommandChannel;
use droidsync_meta::MetadataStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

pub const DEFAULT_WORKERS: usize = 8;

struct Job {
    package: Arc<Package>,
    done: oneshot::Sender<()>,
}

/// Completion signal for one submitted package.
pub struct Resolution {
    id: String,
    done: oneshot::Receiver<()>,
}

/// Barrier over every package submitted in one cycle.
#[derive(Default)]
pub struct ResolutionBatch {
    pending: Vec<Resolution>,
}

impl ResolutionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resolution: Resolution) {
        self.pending.push(resolution);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits until every submitted package has been processed.
    pub async fn wait(self) -> usize {
        let total = self.pending.len();
        for resolution in self.pending {
            if resolution.done.await.is_err() {
                tracing::warn!(
                    "Resolver dropped {} without signalling completion",
                    resolution.id
                );
            }
        }
        total
    }
}

pub struct LabelResolverPool {
    sender: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl LabelResolverPool {
    /// Starts `workers` long-lived tasks. Must be called inside a tokio runtime.
    pub fn spawn(
        channel: Arc<dyn CommandChannel>,
        metadata: Arc<dyn MetadataStore>,
        commands: Arc<PackageCommands>,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(workers);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let channel = Arc::clone(&channel);
                let metadata = Arc::clone(&metadata);
                let commands = Arc::clone(&commands);
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        let Some(job) = job else {
                            break;
                        };
                        resolve(channel.as_ref(), metadata.as_ref(), &commands, &job.package)
                            .await;
                        let _ = job.done.send(());
                    }
                    tracing::debug!("Resolver worker {} stopped", worker);
                })
            })
            .collect();

        tracing::info!("Spawned {} label resolver workers", workers);

        Self {
            sender,
            workers: handles,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues a package for resolution. Waits for room when every worker is busy.
    pub async fn submit(&self, package: Arc<Package>) -> Result<Resolution, InventoryError> {
        let (done, receiver) = oneshot::channel();
        let id = package.id().to_string();
        self.sender
            .send(Job { package, done })
            .await
            .map_err(|_| InventoryError::ResolverClosed)?;
        Ok(Resolution { id, done: receiver })
    }
}

impl Drop for LabelResolverPool {
    fn drop(&mut self) {
        // Queued jobs are dropped with their completion senders, so any
        // waiting batch still returns.
        for handle in &self.workers {
            handle.abort();
        }
    }
}

async fn resolve(
    channel: &dyn CommandChannel,
    metadata: &dyn MetadataStore,
    commands: &PackageCommands,
    package: &Package,
) {
    if !package.has_label() {
        let path = package.path();
        match channel.run(&commands.extract_label(&path)).await {
            Ok(output) => {
                let label = output.trim();
                if package.set_label(label) {
                    tracing::debug!("Resolved label for {}: {}", package.id(), label);
                } else {
                    tracing::debug!("No label extracted for {} at {}", package.id(), path);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to retrieve package label for {} at {}: {}",
                    package.id(),
                    path,
                    e
                );
            }
        }
    }

    if package.metadata().is_none() {
        package.attach_metadata(metadata.lookup(package.id()));
    }
}
