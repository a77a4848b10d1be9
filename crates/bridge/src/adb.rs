use crate::{ChannelError, CommandChannel};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// [`CommandChannel`] backed by the `adb` command-line client.
#[derive(Debug, Clone)]
pub struct AdbChannel {
    adb_path: PathBuf,
    serial: Option<String>,
    timeout: Option<Duration>,
}

impl AdbChannel {
    pub fn new<P: AsRef<Path>>(adb_path: P) -> Self {
        Self {
            adb_path: adb_path.as_ref().to_path_buf(),
            serial: None,
            timeout: None,
        }
    }

    /// Address a specific device instead of the only connected one.
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Bound every device call. Without a timeout a hung device blocks the caller.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub async fn start_server(&self) -> Result<(), ChannelError> {
        let output = self.invoke(&["start-server".to_string()]).await?;
        Self::require_success(output).map(|_| ())
    }

    pub async fn kill_server(&self) -> Result<(), ChannelError> {
        let output = self.invoke(&["kill-server".to_string()]).await?;
        Self::require_success(output).map(|_| ())
    }

    fn base_args(&self) -> Vec<String> {
        match &self.serial {
            Some(serial) => vec!["-s".to_string(), serial.clone()],
            None => Vec::new(),
        }
    }

    async fn invoke(&self, args: &[String]) -> Result<Output, ChannelError> {
        let mut all_args = self.base_args();
        all_args.extend_from_slice(args);

        tracing::debug!("Invoking adb: {:?}", all_args);

        let future = Command::new(&self.adb_path)
            .args(&all_args)
            .kill_on_drop(true)
            .output();

        match self.timeout {
            Some(after) => match tokio::time::timeout(after, future).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(ChannelError::Timeout {
                    command: args.join(" "),
                    after,
                }),
            },
            None => Ok(future.await?),
        }
    }

    fn require_success(output: Output) -> Result<String, ChannelError> {
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(ChannelError::ExecutionFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

#[async_trait]
impl CommandChannel for AdbChannel {
    async fn run(&self, command: &str) -> Result<String, ChannelError> {
        let output = self
            .invoke(&["shell".to_string(), command.to_string()])
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        // Package manager failures are reported on stdout with a non-zero
        // exit code; the caller judges that text, so only an exit with
        // nothing on stdout counts as a transport failure.
        if output.status.success() || !stdout.trim().is_empty() {
            return Ok(stdout);
        }

        Err(ChannelError::ExecutionFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }

    async fn write(&self, remote_path: &str, content: &[u8]) -> Result<(), ChannelError> {
        let mut staged = tempfile::NamedTempFile::new()?;
        staged.write_all(content)?;
        staged.flush()?;

        let local = staged.path().to_string_lossy().to_string();
        tracing::info!("Pushing {} bytes to {}", content.len(), remote_path);

        let pushed = self
            .invoke(&["push".to_string(), local, remote_path.to_string()])
            .await?;
        Self::require_success(pushed)?;

        let chmod = self
            .invoke(&[
                "shell".to_string(),
                format!("chmod 755 {}", remote_path),
            ])
            .await?;
        Self::require_success(chmod)?;

        Ok(())
    }
}
