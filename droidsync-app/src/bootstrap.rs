//! Device preparation and engine construction shared by every command.

use crate::config::{Config, ExtractorConfig};
use anyhow::{bail, Context, Result};
use droidsync_bridge::CommandChannel;
use droidsync_inventory::InventoryEngine;
use droidsync_meta::{JsonMetadataStore, MetadataStore};
use std::fmt;
use std::sync::Arc;

const ABI_PROPERTY: &str = "getprop ro.product.cpu.abi";
const NOT_EXECUTABLE: &str = "not executable";

/// Extractor build flavour. Anything that is not ARM gets the x86 build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abi {
    Arm,
    X86,
}

impl Abi {
    pub fn from_property(value: &str) -> Self {
        if value.contains("arm") {
            Abi::Arm
        } else {
            Abi::X86
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Abi::Arm => "arm",
            Abi::X86 => "x86",
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn detect_abi(channel: &dyn CommandChannel) -> Result<Abi> {
    let value = channel
        .run(ABI_PROPERTY)
        .await
        .context("Failed to read device ABI")?;
    Ok(Abi::from_property(value.trim()))
}

/// Pushes the label extractor matching the device ABI to `remote_path` and
/// checks that it runs.
pub async fn provision_extractor(
    channel: &dyn CommandChannel,
    extractor: &ExtractorConfig,
    remote_path: &str,
) -> Result<Abi> {
    let abi = detect_abi(channel).await?;
    let local = extractor.binaries_dir.join(abi.as_str());
    let binary = std::fs::read(&local)
        .with_context(|| format!("Failed to read extractor binary {}", local.display()))?;

    channel
        .write(remote_path, &binary)
        .await
        .with_context(|| format!("Failed to push extractor to {}", remote_path))?;

    let probe = channel
        .run(remote_path)
        .await
        .context("Failed to run extractor")?;
    if probe.contains(NOT_EXECUTABLE) {
        bail!("Extractor at {} is not executable on the device", remote_path);
    }

    tracing::info!("Provisioned {} extractor at {}", abi, remote_path);
    Ok(abi)
}

pub fn load_metadata(config: &Config) -> Result<Arc<dyn MetadataStore>> {
    match &config.metadata_db {
        Some(path) => {
            let store = JsonMetadataStore::load(path)
                .with_context(|| format!("Failed to load metadata from {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::debug!("No metadata database configured");
            Ok(Arc::new(JsonMetadataStore::new()))
        }
    }
}

/// Provisions the device when enabled, builds the engine and runs the first
/// refresh. A failed first refresh is logged; later cycles retry it.
pub async fn build_engine(
    config: &Config,
    channel: Arc<dyn CommandChannel>,
) -> Result<Arc<InventoryEngine>> {
    config.validate()?;

    if config.extractor.provision {
        provision_extractor(
            channel.as_ref(),
            &config.extractor,
            &config.commands.extractor,
        )
        .await?;
    }

    let metadata = load_metadata(config)?;
    let engine = Arc::new(InventoryEngine::new(
        channel,
        metadata,
        config.engine_config(),
    ));

    match engine.refresh().await {
        Ok(report) => tracing::info!(
            "Initial inventory holds {} packages (generation {})",
            report.added.len(),
            report.generation
        ),
        Err(e) => tracing::warn!("Initial refresh failed: {}", e),
    }

    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_from_property() {
        assert_eq!(Abi::from_property("arm64-v8a"), Abi::Arm);
        assert_eq!(Abi::from_property("armeabi-v7a"), Abi::Arm);
        assert_eq!(Abi::from_property("x86_64"), Abi::X86);
        assert_eq!(Abi::from_property(""), Abi::X86);
    }
}
