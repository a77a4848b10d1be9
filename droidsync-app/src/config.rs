use anyhow::{bail, Context, Result};
use droidsync_bridge::AdbChannel;
use droidsync_inventory::{EngineConfig, PackageCommands, RefreshLoopConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "DROIDSYNC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "droidsync.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub extractor: ExtractorConfig,
    /// JSON array of package descriptions. Without it every package gets
    /// the placeholder description.
    pub metadata_db: Option<PathBuf>,
    pub refresh: RefreshConfig,
    pub commands: PackageCommands,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub adb_path: PathBuf,
    pub serial: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub kill_server_on_exit: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            serial: None,
            command_timeout_secs: Some(30),
            kill_server_on_exit: false,
        }
    }
}

impl DeviceConfig {
    pub fn channel(&self) -> AdbChannel {
        let mut channel = AdbChannel::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            channel = channel.with_serial(serial.clone());
        }
        if let Some(secs) = self.command_timeout_secs {
            channel = channel.with_timeout(Duration::from_secs(secs));
        }
        channel
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Push the label extractor to the device on start.
    pub provision: bool,
    /// Directory holding one extractor build per architecture (`arm`, `x86`).
    pub binaries_dir: PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provision: true,
            binaries_dir: PathBuf::from("extractor/build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub min_interval_ms: u64,
    pub retry_delay_ms: u64,
    pub resolver_workers: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            retry_delay_ms: 5000,
            resolver_workers: 8,
        }
    }
}

impl RefreshConfig {
    pub fn loop_config(&self) -> RefreshLoopConfig {
        RefreshLoopConfig {
            min_interval: Duration::from_millis(self.min_interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Explicit path, then `DROIDSYNC_CONFIG`, then `./droidsync.yaml`.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.adb_path.as_os_str().is_empty() {
            bail!("device.adb_path cannot be empty");
        }
        if self.device.command_timeout_secs == Some(0) {
            bail!("device.command_timeout_secs must be positive; omit it to disable the timeout");
        }
        if self.refresh.resolver_workers == 0 {
            bail!("refresh.resolver_workers must be at least 1");
        }
        if self.extractor.provision && self.extractor.binaries_dir.as_os_str().is_empty() {
            bail!("extractor.binaries_dir cannot be empty when provisioning is enabled");
        }
        if let Err(e) = self.commands.validate() {
            bail!("{}", e);
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            resolver_workers: self.refresh.resolver_workers,
            commands: self.commands.clone(),
        }
    }
}
