use crate::config::Config;
use anyhow::{bail, Result};
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    Config::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
