#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Scripted device used by the integration tests.

use async_trait::async_trait;
use droidsync_bridge::{ChannelError, CommandChannel};
use droidsync_inventory::{EngineConfig, InventoryEngine, PackageCommands};
use droidsync_meta::{JsonMetadataStore, Metadata};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LIST: &str = "pm list packages -f";
pub const EXTRACTOR: &str = "/data/local/tmp/extractor ";

/// Answers device commands from canned output and records every call.
#[derive(Default)]
pub struct ScriptedChannel {
    listing: Mutex<Option<String>>,
    listing_delay: Mutex<Duration>,
    labels: Mutex<HashMap<String, String>>,
    label_delay: Mutex<Duration>,
    replies: Mutex<HashMap<String, Result<String, String>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the listing to `(path, id)` pairs. An empty slice is a valid,
    /// empty listing.
    pub fn set_listing(&self, packages: &[(&str, &str)]) {
        let text = packages
            .iter()
            .map(|(path, id)| format!("package:{}={}", path, id))
            .collect::<Vec<_>>()
            .join("\n");
        self.set_raw_listing(&format!("{}\n", text));
    }

    pub fn set_raw_listing(&self, text: &str) {
        *self.listing.lock().unwrap() = Some(text.to_string());
    }

    /// Makes the listing command fail.
    pub fn break_listing(&self) {
        *self.listing.lock().unwrap() = None;
    }

    pub fn set_listing_delay(&self, delay: Duration) {
        *self.listing_delay.lock().unwrap() = delay;
    }

    pub fn set_label(&self, path: &str, label: &str) {
        self.labels
            .lock()
            .unwrap()
            .insert(path.to_string(), label.to_string());
    }

    pub fn set_label_delay(&self, delay: Duration) {
        *self.label_delay.lock().unwrap() = delay;
    }

    pub fn reply(&self, command: &str, output: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), Ok(output.to_string()));
    }

    pub fn fail(&self, command: &str, error: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), Err(error.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn label_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix(EXTRACTOR).map(str::to_string))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn run(&self, command: &str) -> Result<String, ChannelError> {
        self.calls.lock().unwrap().push(command.to_string());

        if command == LIST {
            let delay = *self.listing_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return self
                .listing
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ChannelError::ExecutionFailed("device offline".to_string()));
        }

        if let Some(path) = command.strip_prefix(EXTRACTOR) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = *self.label_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let label = self.labels.lock().unwrap().get(path).cloned();

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return label
                .map(|label| format!("{}\n", label))
                .ok_or_else(|| ChannelError::ExecutionFailed("extractor crashed".to_string()));
        }

        match self.replies.lock().unwrap().get(command).cloned() {
            Some(Ok(output)) => Ok(output),
            Some(Err(error)) => Err(ChannelError::ExecutionFailed(error)),
            None => Err(ChannelError::ExecutionFailed(format!(
                "unexpected command: {}",
                command
            ))),
        }
    }

    async fn write(&self, remote_path: &str, _content: &[u8]) -> Result<(), ChannelError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("write {}", remote_path));
        Ok(())
    }
}

pub fn metadata() -> Arc<JsonMetadataStore> {
    Arc::new(JsonMetadataStore::from_entries(vec![
        Metadata {
            id: "com.a".to_string(),
            description: "Alpha launcher".to_string(),
            removal: "Recommended".to_string(),
            classification: "Oem".to_string(),
        },
        // Known to the store, but with no description.
        Metadata {
            id: "com.sparse".to_string(),
            removal: "Expert".to_string(),
            ..Metadata::default()
        },
    ]))
}

pub fn engine(channel: &Arc<ScriptedChannel>) -> InventoryEngine {
    engine_with_workers(channel, 8)
}

pub fn engine_with_workers(channel: &Arc<ScriptedChannel>, workers: usize) -> InventoryEngine {
    InventoryEngine::new(
        Arc::clone(channel) as Arc<dyn CommandChannel>,
        metadata(),
        EngineConfig {
            resolver_workers: workers,
            commands: PackageCommands::default(),
        },
    )
}
