use crate::bootstrap::build_engine;
use crate::config::Config;
use anyhow::{bail, Result};
use droidsync_bridge::CommandChannel;
use droidsync_inventory::ToggleOutcome;
use std::sync::Arc;

/// A package missing from the listing is taken to be disabled, so this can
/// re-enable packages disabled before the process started.
pub async fn run(
    config: &Config,
    channel: Arc<dyn CommandChannel>,
    id: &str,
) -> Result<ToggleOutcome> {
    let engine = build_engine(config, channel).await?;
    let outcome = engine.toggle_or_reenable(id).await;
    if !outcome.success {
        bail!("{}", outcome.message);
    }
    println!("{}", outcome);
    Ok(outcome)
}
