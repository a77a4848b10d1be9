use crate::bootstrap::{detect_abi, load_metadata};
use crate::config::Config;
use anyhow::{bail, Result};
use droidsync_bridge::{AdbChannel, CommandChannel};
use droidsync_inventory::listing::parse_listing;

fn report(name: &str, result: Result<String>) -> bool {
    match result {
        Ok(detail) if detail.is_empty() => {
            println!("{}... ok", name);
            true
        }
        Ok(detail) => {
            println!("{}... ok ({})", name, detail);
            true
        }
        Err(e) => {
            println!("{}... FAILED ({:#})", name, e);
            false
        }
    }
}

pub async fn run(config: &Config) -> Result<()> {
    println!("Health check\n");
    let mut healthy = report("Configuration", config.validate().map(|_| String::new()));

    let channel = config.device.channel();
    let server = channel
        .start_server()
        .await
        .map(|_| String::new())
        .map_err(anyhow::Error::from);
    if !report("adb server", server) {
        bail!("Health check failed");
    }

    healthy &= report("Device", device(&channel).await);
    healthy &= report("Package listing", listing(&channel, config).await);
    if config.extractor.provision {
        healthy &= report("Extractor binary", extractor(&channel, config).await);
    }
    healthy &= report(
        "Metadata",
        load_metadata(config).map(|_| match &config.metadata_db {
            Some(path) => path.display().to_string(),
            None => "none configured".to_string(),
        }),
    );

    println!();
    if healthy {
        println!("All checks passed");
        Ok(())
    } else {
        bail!("Health check failed");
    }
}

async fn device(channel: &AdbChannel) -> Result<String> {
    let abi = detect_abi(channel).await?;
    Ok(match channel.serial() {
        Some(serial) => format!("{}, {}", serial, abi),
        None => abi.to_string(),
    })
}

async fn listing(channel: &AdbChannel, config: &Config) -> Result<String> {
    let output = channel.run(&config.commands.list_packages()).await?;
    let (entries, errors) = parse_listing(&output);
    if entries.is_empty() {
        bail!("no packages in listing");
    }
    Ok(format!(
        "{} packages, {} unparsed lines",
        entries.len(),
        errors.len()
    ))
}

async fn extractor(channel: &AdbChannel, config: &Config) -> Result<String> {
    let abi = detect_abi(channel).await?;
    let path = config.extractor.binaries_dir.join(abi.as_str());
    if !path.is_file() {
        bail!("{} not found", path.display());
    }
    Ok(path.display().to_string())
}
