//! Enable/disable state machine for a single package.

use crate::commands::{extract_installer_path, PackageCommands};
use crate::package::Package;
use droidsync_bridge::CommandChannel;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageStatus {
    Enabled,
    Disabled,
}

impl PackageStatus {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            PackageStatus::Enabled
        } else {
            PackageStatus::Disabled
        }
    }
}

/// Result of a toggle request. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub id: String,
    pub success: bool,
    /// State of the package after the attempt. `None` when the package is
    /// not in the inventory.
    pub status: Option<PackageStatus>,
    pub message: String,
}

impl ToggleOutcome {
    fn succeeded(package: &Package, message: String) -> Self {
        tracing::info!("{}", message);
        Self {
            id: package.id().to_string(),
            success: true,
            status: Some(PackageStatus::from_enabled(package.is_enabled())),
            message,
        }
    }

    fn failed(package: &Package, message: String) -> Self {
        tracing::warn!("{}", message);
        Self {
            id: package.id().to_string(),
            success: false,
            status: Some(PackageStatus::from_enabled(package.is_enabled())),
            message,
        }
    }

    pub fn unknown(id: &str) -> Self {
        let message = format!("Package {} is not in the inventory", id);
        tracing::warn!("{}", message);
        Self {
            id: id.to_string(),
            success: false,
            status: None,
            message,
        }
    }
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Wire shape of a toggle reply: `{"status": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub status: String,
}

impl From<ToggleOutcome> for ToggleResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            status: outcome.message,
        }
    }
}

/// Flips `package` between enabled and disabled on the device.
///
/// Concurrent toggles on the same package run one after another; the second
/// sees the state the first left behind.
pub async fn toggle_package(
    channel: &dyn CommandChannel,
    commands: &PackageCommands,
    package: &Package,
) -> ToggleOutcome {
    let _transition = package.begin_transition().await;

    if package.is_enabled() {
        disable(channel, commands, package).await
    } else {
        enable(channel, commands, package).await
    }
}

async fn disable(
    channel: &dyn CommandChannel,
    commands: &PackageCommands,
    package: &Package,
) -> ToggleOutcome {
    let output = match channel.run(&commands.uninstall(package.id())).await {
        Ok(output) => output,
        Err(e) => {
            return ToggleOutcome::failed(
                package,
                format!("Failed to run uninstall command on {}: {}", package, e),
            )
        }
    };

    if !commands.is_success(&output) {
        return ToggleOutcome::failed(
            package,
            with_reply(format!("Failed to uninstall {}", package), &output),
        );
    }

    package.set_enabled(false);
    ToggleOutcome::succeeded(package, format!("Successfully uninstalled {}", package))
}

async fn enable(
    channel: &dyn CommandChannel,
    commands: &PackageCommands,
    package: &Package,
) -> ToggleOutcome {
    let dump = match channel.run(&commands.dump(package.id())).await {
        Ok(output) => output,
        Err(e) => {
            return ToggleOutcome::failed(
                package,
                format!(
                    "Failed to dump path for issuing reinstall command on {}: {}",
                    package, e
                ),
            )
        }
    };

    // Only system packages keep an installer on the device.
    let Some(path) = extract_installer_path(&dump) else {
        return ToggleOutcome::failed(
            package,
            format!("Failed to find package path for {}", package),
        );
    };

    let output = match channel.run(&commands.reinstall(&path)).await {
        Ok(output) => output,
        Err(e) => {
            return ToggleOutcome::failed(
                package,
                format!("Failed to run reinstall command on {}: {}", package, e),
            )
        }
    };

    if !commands.is_success(&output) {
        return ToggleOutcome::failed(
            package,
            with_reply(format!("Failed to reinstall {}", package), &output),
        );
    }

    package.set_enabled(true);
    ToggleOutcome::succeeded(package, format!("Successfully reinstalled {}", package))
}

fn with_reply(message: String, output: &str) -> String {
    let reply = output.trim();
    if reply.is_empty() {
        message
    } else {
        format!("{}: {}", message, reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_carries_message() {
        let outcome = ToggleOutcome {
            id: "com.a".to_string(),
            success: true,
            status: Some(PackageStatus::Disabled),
            message: "Successfully uninstalled Alpha (com.a)".to_string(),
        };
        let response = ToggleResponse::from(outcome);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"Successfully uninstalled Alpha (com.a)"}"#);
    }

    #[test]
    fn test_with_reply() {
        assert_eq!(with_reply("Failed".to_string(), "  \n"), "Failed");
        assert_eq!(
            with_reply("Failed".to_string(), "Failure [NOT_INSTALLED_FOR_USER]\n"),
            "Failed: Failure [NOT_INSTALLED_FOR_USER]"
        );
    }

    #[test]
    fn test_unknown_package_outcome() {
        let outcome = ToggleOutcome::unknown("com.ghost");
        assert!(!outcome.success);
        assert!(outcome.status.is_none());
        assert_eq!(outcome.to_string(), "Package com.ghost is not in the inventory");
    }
}
