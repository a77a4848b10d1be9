//! Generations of the inventory and the swap that publishes them.

use crate::package::{Package, PackageView};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// One immutable generation of the inventory, keyed by package id.
#[derive(Debug, Default)]
pub struct Inventory {
    generation: u64,
    packages: HashMap<String, Arc<Package>>,
}

impl Inventory {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Package>> {
        self.packages.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.packages.values()
    }

    /// Labelled packages first, by label; the rest by id.
    pub fn sorted(&self) -> Vec<Arc<Package>> {
        let mut keyed: Vec<(Option<String>, Arc<Package>)> = self
            .packages
            .values()
            .map(|package| (package.label(), Arc::clone(package)))
            .collect();

        keyed.sort_by(|(a_label, a), (b_label, b)| match (a_label, b_label) {
            (Some(a_label), Some(b_label)) => {
                a_label.cmp(b_label).then_with(|| a.id().cmp(b.id()))
            }
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id().cmp(b.id()),
        });

        keyed.into_iter().map(|(_, package)| package).collect()
    }

    /// Case-insensitive match on id or label. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<Arc<Package>> {
        let query = query.trim().to_lowercase();
        self.sorted()
            .into_iter()
            .filter(|package| {
                query.is_empty()
                    || package.id().to_lowercase().contains(&query)
                    || package
                        .label()
                        .is_some_and(|label| label.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn views(&self) -> Vec<PackageView> {
        self.sorted().iter().map(|package| package.view()).collect()
    }
}

/// Holder of the current generation.
///
/// Readers clone the `Arc`; the refresh engine is the only publisher.
pub struct InventoryCache {
    current: RwLock<Arc<Inventory>>,
    updates: watch::Sender<Arc<Inventory>>,
}

impl InventoryCache {
    pub fn new() -> Self {
        let initial = Arc::new(Inventory::default());
        let (updates, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: RwLock::new(initial),
            updates,
        }
    }

    pub fn snapshot(&self) -> Arc<Inventory> {
        self.current.read().clone()
    }

    /// Swaps in a new generation and notifies subscribers.
    pub fn publish(&self, packages: HashMap<String, Arc<Package>>) -> Arc<Inventory> {
        let next = {
            let mut current = self.current.write();
            let next = Arc::new(Inventory {
                generation: current.generation + 1,
                packages,
            });
            *current = Arc::clone(&next);
            next
        };
        self.updates.send_replace(Arc::clone(&next));
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Inventory>> {
        self.updates.subscribe()
    }
}

impl Default for InventoryCache {
    fn default() -> Self {
        Self::new()
    }
}
