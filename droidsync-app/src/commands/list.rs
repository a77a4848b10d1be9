use crate::bootstrap::build_engine;
use crate::config::Config;
use crate::session::render_row;
use anyhow::Result;
use droidsync_bridge::AdbChannel;
use droidsync_inventory::PackageView;
use std::sync::Arc;

pub async fn run(
    config: &Config,
    channel: Arc<AdbChannel>,
    query: Option<&str>,
    json: bool,
) -> Result<()> {
    let engine = build_engine(config, channel).await?;
    let inventory = engine.snapshot();
    let packages = match query {
        Some(query) => inventory.search(query),
        None => inventory.sorted(),
    };

    if json {
        let views: Vec<PackageView> = packages.iter().map(|p| p.view()).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        for package in &packages {
            println!("{}", render_row(package));
        }
    }
    Ok(())
}
