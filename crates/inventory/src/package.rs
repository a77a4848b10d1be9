//! The package record shared between the cache, the resolver pool and toggle.

use chrono::{DateTime, Utc};
use droidsync_meta::Metadata;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{Mutex, MutexGuard};

pub const DESCRIPTION_PLACEHOLDER: &str = "Description not yet available.";

/// Mutable part of a package record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageState {
    pub path: String,
    pub label: String,
    pub metadata: Option<Metadata>,
    pub enabled: bool,
    /// Bumped on every confirmed toggle transition.
    pub revision: u64,
}

/// One package on the device.
///
/// Records are created once per id and shared as `Arc<Package>` across cache
/// generations, so a mutation is visible to every holder.
#[derive(Debug)]
pub struct Package {
    id: String,
    discovered_at: DateTime<Utc>,
    state: RwLock<PackageState>,
    transition: Mutex<()>,
}

impl Package {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            discovered_at: Utc::now(),
            state: RwLock::new(PackageState {
                path: path.into(),
                enabled: true,
                ..PackageState::default()
            }),
            transition: Mutex::new(()),
        }
    }

    /// A package the listing does not show, taken to be disabled.
    pub fn unlisted(id: impl Into<String>) -> Self {
        let package = Self::new(id, "");
        package.state.write().enabled = false;
        package
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }

    pub fn path(&self) -> String {
        self.state.read().path.clone()
    }

    pub fn label(&self) -> Option<String> {
        let state = self.state.read();
        if state.label.is_empty() {
            None
        } else {
            Some(state.label.clone())
        }
    }

    pub fn has_label(&self) -> bool {
        !self.state.read().label.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.state.read().metadata.clone()
    }

    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    pub fn state(&self) -> PackageState {
        self.state.read().clone()
    }

    pub fn view(&self) -> PackageView {
        let state = self.state.read();
        let meta = state.metadata.clone().unwrap_or_default();
        PackageView {
            id: self.id.clone(),
            label: state.label.clone(),
            enabled: state.enabled,
            description: meta.description,
            removal: meta.removal,
            classification: meta.classification,
        }
    }

    /// Sets the label once. Empty labels and already-labelled records are ignored.
    pub(crate) fn set_label(&self, label: &str) -> bool {
        if label.is_empty() {
            return false;
        }
        let mut state = self.state.write();
        if !state.label.is_empty() {
            return false;
        }
        state.label = label.to_string();
        true
    }

    pub(crate) fn attach_metadata(&self, found: Option<Metadata>) {
        let mut meta = found.unwrap_or_else(|| Metadata {
            id: self.id.clone(),
            ..Metadata::default()
        });
        if meta.description.is_empty() {
            meta.description = DESCRIPTION_PLACEHOLDER.to_string();
        }
        self.state.write().metadata = Some(meta);
    }

    pub(crate) fn set_path(&self, path: &str) -> bool {
        let mut state = self.state.write();
        if state.path == path {
            return false;
        }
        state.path = path.to_string();
        true
    }

    /// Records a confirmed toggle transition.
    pub(crate) fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.write();
        state.enabled = enabled;
        state.revision += 1;
    }

    /// Applies what a listing observed, unless a toggle landed since
    /// `seen_revision` was read. Returns whether `enabled` flipped.
    pub(crate) fn reconcile_enabled(&self, enabled: bool, seen_revision: u64) -> bool {
        let mut state = self.state.write();
        if state.revision != seen_revision || state.enabled == enabled {
            return false;
        }
        state.enabled = enabled;
        true
    }

    pub(crate) async fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().await
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{} ({})", label, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Flat, serializable snapshot of a record for consumers of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageView {
    pub id: String,
    pub label: String,
    pub enabled: bool,
    pub description: String,
    pub removal: String,
    pub classification: String,
}
