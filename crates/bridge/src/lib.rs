//! Command channel to a connected Android device.
//!
//! Everything above this crate talks to the device through [`CommandChannel`]:
//! run a shell command and read its text output, or push a file.

pub mod adb;

pub use adb::AdbChannel;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Command `{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shell access to a device.
///
/// Implementations must tolerate concurrent calls; the label resolver pool
/// issues several commands at once.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Run a shell command on the device and return its standard output.
    async fn run(&self, command: &str) -> Result<String, ChannelError>;

    /// Write `content` to `remote_path` on the device, marking it executable.
    async fn write(&self, remote_path: &str, content: &[u8]) -> Result<(), ChannelError>;
}
