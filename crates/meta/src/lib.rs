pub mod store;

pub use store::{JsonMetadataStore, MetadataError};

use serde::{Deserialize, Serialize};

/// Static knowledge about a package, keyed by its identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Advice on whether removing the package is safe.
    #[serde(default)]
    pub removal: String,
    #[serde(default, alias = "list")]
    pub classification: String,
}

pub trait MetadataStore: Send + Sync {
    fn lookup(&self, id: &str) -> Option<Metadata>;
}
