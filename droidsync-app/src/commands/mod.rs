pub mod health;
pub mod init;
pub mod list;
pub mod run;
pub mod toggle;

use crate::config::Config;
use anyhow::{Context, Result};
use droidsync_bridge::AdbChannel;
use std::sync::Arc;

/// Starts the adb server and returns a channel to the configured device.
pub async fn connect(config: &Config) -> Result<Arc<AdbChannel>> {
    let channel = config.device.channel();
    channel
        .start_server()
        .await
        .context("Failed to start adb server. Is adb installed and on PATH?")?;
    Ok(Arc::new(channel))
}
