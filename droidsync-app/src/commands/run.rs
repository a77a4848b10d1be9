use crate::bootstrap::build_engine;
use crate::config::Config;
use crate::session::Session;
use anyhow::Result;
use droidsync_bridge::AdbChannel;
use droidsync_interfaces::TerminalConsole;
use droidsync_inventory::RefreshLoop;
use std::sync::Arc;

pub async fn run(config: &Config, channel: Arc<AdbChannel>) -> Result<()> {
    let engine = build_engine(config, channel).await?;
    let refresh_loop = RefreshLoop::spawn(Arc::clone(&engine), config.refresh.loop_config());

    let console = Arc::new(TerminalConsole::new());
    Session::new(engine, console).run().await;

    let stats = refresh_loop.stop().await;
    tracing::info!(
        "Session ended after {} refresh cycles ({} changed, {} failed)",
        stats.cycles,
        stats.changes,
        stats.failures
    );
    Ok(())
}
