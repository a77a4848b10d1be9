//! Refresh/diff engine: owns the cache, the device channel and the resolver pool.

use crate::cache::{Inventory, InventoryCache};
use crate::commands::PackageCommands;
use crate::error::InventoryError;
use crate::listing::parse_listing;
use crate::package::Package;
use crate::resolver::{LabelResolverPool, ResolutionBatch, DEFAULT_WORKERS};
use crate::toggle::{toggle_package, ToggleOutcome};
use chrono::{DateTime, Utc};
use droidsync_bridge::CommandChannel;
use droidsync_meta::MetadataStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub resolver_workers: usize,
    pub commands: PackageCommands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolver_workers: DEFAULT_WORKERS,
            commands: PackageCommands::default(),
        }
    }
}

/// What one refresh cycle found.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub added: Vec<String>,
    pub disabled: Vec<String>,
    pub restored: Vec<String>,
    pub skipped_lines: usize,
    /// Generation current once the cycle finished.
    pub generation: u64,
    pub finished_at: DateTime<Utc>,
}

impl RefreshReport {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.disabled.is_empty() || !self.restored.is_empty()
    }
}

pub struct InventoryEngine {
    channel: Arc<dyn CommandChannel>,
    commands: Arc<PackageCommands>,
    cache: InventoryCache,
    resolver: LabelResolverPool,
    writer: Mutex<()>,
}

impl InventoryEngine {
    /// Builds the engine and starts its resolver workers. Must be called
    /// inside a tokio runtime.
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        metadata: Arc<dyn MetadataStore>,
        config: EngineConfig,
    ) -> Self {
        let commands = Arc::new(config.commands);
        let resolver = LabelResolverPool::spawn(
            Arc::clone(&channel),
            metadata,
            Arc::clone(&commands),
            config.resolver_workers,
        );
        Self {
            channel,
            commands,
            cache: InventoryCache::new(),
            resolver,
            writer: Mutex::new(()),
        }
    }

    pub fn commands(&self) -> &PackageCommands {
        &self.commands
    }

    pub fn channel(&self) -> &Arc<dyn CommandChannel> {
        &self.channel
    }

    pub fn snapshot(&self) -> Arc<Inventory> {
        self.cache.snapshot()
    }

    /// Receives every generation published after a changed refresh.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Inventory>> {
        self.cache.subscribe()
    }

    /// Runs one enumerate, diff, resolve, publish cycle.
    ///
    /// A failed listing leaves the cache and every record untouched.
    pub async fn refresh(&self) -> Result<RefreshReport, InventoryError> {
        let _writer = self.writer.lock().await;

        let previous = self.cache.snapshot();
        // Read before the listing runs so a toggle that lands while the
        // listing is in flight is not overwritten below.
        let revisions: HashMap<String, u64> = previous
            .iter()
            .map(|package| (package.id().to_string(), package.revision()))
            .collect();

        let output = self
            .channel
            .run(&self.commands.list_packages())
            .await
            .map_err(InventoryError::Listing)?;

        let (entries, errors) = parse_listing(&output);
        for error in &errors {
            tracing::warn!("Skipping listing line: {}", error);
        }

        let mut next: HashMap<String, Arc<Package>> = HashMap::with_capacity(previous.len());
        let mut seen: Vec<(Arc<Package>, String)> = Vec::new();
        let mut added = Vec::new();
        let mut batch = ResolutionBatch::new();

        for entry in entries {
            if next.contains_key(&entry.id) {
                tracing::debug!("Duplicate listing entry for {}", entry.id);
                continue;
            }
            match previous.get(&entry.id) {
                Some(existing) => {
                    seen.push((Arc::clone(existing), entry.path));
                    next.insert(entry.id, Arc::clone(existing));
                }
                None => {
                    let package = Arc::new(Package::new(entry.id.clone(), entry.path));
                    batch.push(self.resolver.submit(Arc::clone(&package)).await?);
                    added.push(entry.id.clone());
                    next.insert(entry.id, package);
                }
            }
        }

        if !batch.is_empty() {
            let resolved = batch.wait().await;
            tracing::debug!("Resolved {} new packages", resolved);
        }

        let mut restored = Vec::new();
        for (package, path) in seen {
            if package.set_path(&path) {
                tracing::debug!("Path of {} is now {}", package.id(), path);
            }
            let seen_revision = revisions.get(package.id()).copied().unwrap_or_default();
            if package.reconcile_enabled(true, seen_revision) {
                restored.push(package.id().to_string());
            }
        }

        // The listing omits disabled packages, so a missing id means
        // disabled, never uninstalled.
        let mut disabled = Vec::new();
        for package in previous.iter() {
            if next.contains_key(package.id()) {
                continue;
            }
            let seen_revision = revisions.get(package.id()).copied().unwrap_or_default();
            if package.reconcile_enabled(false, seen_revision) {
                disabled.push(package.id().to_string());
            }
            next.insert(package.id().to_string(), Arc::clone(package));
        }

        let mut report = RefreshReport {
            added,
            disabled,
            restored,
            skipped_lines: errors.len(),
            generation: previous.generation(),
            finished_at: Utc::now(),
        };

        if report.changed() {
            let published = self.cache.publish(next);
            report.generation = published.generation();
            tracing::info!(
                "Inventory generation {}: {} packages, {} added, {} disabled, {} restored",
                published.generation(),
                published.len(),
                report.added.len(),
                report.disabled.len(),
                report.restored.len()
            );
        }

        Ok(report)
    }

    /// Resolves packages whose label is still empty.
    ///
    /// Refresh never retries a failed label on its own; this is the opt-in
    /// way to do it. Returns how many packages were submitted.
    pub async fn relabel_unresolved(&self) -> Result<usize, InventoryError> {
        let _writer = self.writer.lock().await;

        let mut batch = ResolutionBatch::new();
        for package in self.cache.snapshot().iter() {
            if !package.has_label() {
                batch.push(self.resolver.submit(Arc::clone(package)).await?);
            }
        }

        let submitted = batch.wait().await;
        tracing::info!("Retried label resolution for {} packages", submitted);
        Ok(submitted)
    }

    /// Toggles the package with `id` in the current generation.
    pub async fn toggle(&self, id: &str) -> ToggleOutcome {
        let package = self.cache.snapshot().get(id).cloned();
        match package {
            Some(package) => self.toggle_package(&package).await,
            None => ToggleOutcome::unknown(id),
        }
    }

    /// Like [`toggle`](Self::toggle), but an id missing from the inventory is
    /// treated as a disabled package and re-enabled.
    ///
    /// The listing never shows disabled packages, so one disabled before the
    /// first refresh is otherwise unreachable. The record is not added to the
    /// cache; the next refresh picks the package up if the reinstall worked.
    pub async fn toggle_or_reenable(&self, id: &str) -> ToggleOutcome {
        let package = self.cache.snapshot().get(id).cloned();
        match package {
            Some(package) => self.toggle_package(&package).await,
            None => self.toggle_package(&Package::unlisted(id)).await,
        }
    }

    pub async fn toggle_package(&self, package: &Package) -> ToggleOutcome {
        toggle_package(self.channel.as_ref(), &self.commands, package).await
    }
}
