use crate::{Metadata, MetadataStore};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid metadata database: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Metadata loaded once from a JSON array of entries.
#[derive(Debug, Default, Clone)]
pub struct JsonMetadataStore {
    entries: HashMap<String, Metadata>,
}

impl JsonMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, MetadataError> {
        let list: Vec<Metadata> = serde_json::from_slice(bytes)?;
        Ok(Self::from_entries(list))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let bytes = std::fs::read(path.as_ref())?;
        let store = Self::from_slice(&bytes)?;
        tracing::info!(
            "Loaded {} metadata entries from {:?}",
            store.len(),
            path.as_ref()
        );
        Ok(store)
    }

    pub fn from_entries(list: impl IntoIterator<Item = Metadata>) -> Self {
        let mut entries = HashMap::new();
        for entry in list {
            // First entry for an id wins.
            entries.entry(entry.id.clone()).or_insert(entry);
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataStore for JsonMetadataStore {
    fn lookup(&self, id: &str) -> Option<Metadata> {
        self.entries.get(id).cloned()
    }
}
