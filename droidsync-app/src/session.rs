//! Interactive console session over a live inventory.

use droidsync_interfaces::Console;
use droidsync_inventory::{InventoryEngine, Package};
use std::sync::Arc;

const PROMPT: &str = "droidsync> ";

const HELP: &str = "\
Commands:
  list [query]      List packages, optionally filtered by name or label
  show <package>    Show details for one package
  toggle <package>  Disable an enabled package or re-enable a disabled one
  refresh           Sync with the device now
  relabel           Retry packages whose label could not be read
  status            Inventory summary
  help              Show this message
  exit, quit        Leave the console";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// One inventory row: `[x] Label (com.id)` for enabled, `[ ]` for disabled.
pub fn render_row(package: &Package) -> String {
    let mark = if package.is_enabled() { "x" } else { " " };
    format!("[{}] {}", mark, package)
}

pub struct Session {
    engine: Arc<InventoryEngine>,
    console: Arc<dyn Console>,
}

impl Session {
    pub fn new(engine: Arc<InventoryEngine>, console: Arc<dyn Console>) -> Self {
        Self { engine, console }
    }

    /// Reads commands until `exit` or end of input.
    pub async fn run(&self) {
        self.console
            .print("droidsync console. Type 'help' for commands.")
            .await;
        while let Some(line) = self.console.read_line(PROMPT).await {
            if self.handle(&line).await == Flow::Exit {
                break;
            }
        }
    }

    pub async fn handle(&self, line: &str) -> Flow {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, Some(rest.trim()).filter(|s| !s.is_empty())),
            None => (line, None),
        };

        match command {
            "" => {}
            "exit" | "quit" => return Flow::Exit,
            "help" => self.console.print(HELP).await,
            "list" => self.list(argument).await,
            "show" => match argument {
                Some(id) => self.show(id).await,
                None => self.console.print("Usage: show <package>").await,
            },
            "toggle" => match argument {
                Some(id) => self.toggle(id).await,
                None => self.console.print("Usage: toggle <package>").await,
            },
            "refresh" => self.refresh().await,
            "relabel" => self.relabel().await,
            "status" => self.status().await,
            other => {
                self.console
                    .print(&format!("Unknown command '{}'. Type 'help'.", other))
                    .await
            }
        }
        Flow::Continue
    }

    async fn list(&self, query: Option<&str>) {
        let inventory = self.engine.snapshot();
        let packages = match query {
            Some(query) => inventory.search(query),
            None => inventory.sorted(),
        };
        if packages.is_empty() {
            self.console.print("No packages.").await;
            return;
        }
        let rows: Vec<String> = packages.iter().map(|p| render_row(p)).collect();
        self.console.print(&rows.join("\n")).await;
    }

    async fn show(&self, id: &str) {
        let inventory = self.engine.snapshot();
        let Some(package) = inventory.get(id) else {
            self.console
                .print(&format!("Package {} is not in the inventory", id))
                .await;
            return;
        };

        let view = package.view();
        let discovered = package
            .discovered_at()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S");
        let mut lines = vec![
            render_row(package),
            format!("  path:           {}", package.path()),
            format!("  discovered:     {}", discovered),
        ];
        if !view.description.is_empty() {
            lines.push(format!("  description:    {}", view.description));
        }
        if !view.removal.is_empty() {
            lines.push(format!("  removal:        {}", view.removal));
        }
        if !view.classification.is_empty() {
            lines.push(format!("  classification: {}", view.classification));
        }
        self.console.print(&lines.join("\n")).await;
    }

    async fn toggle(&self, id: &str) {
        let inventory = self.engine.snapshot();
        // Ids the listing never showed can only be disabled packages.
        let question = match inventory.get(id) {
            Some(package) if package.is_enabled() => format!("Uninstall {}?", package),
            Some(package) => format!("Reinstall {}?", package),
            None => format!("{} is not listed. Try to reinstall it?", id),
        };
        if !self.console.confirm(&question).await {
            self.console.print("Cancelled.").await;
            return;
        }

        let outcome = self.engine.toggle_or_reenable(id).await;
        self.console.print(&outcome.to_string()).await;
    }

    async fn refresh(&self) {
        match self.engine.refresh().await {
            Ok(report) if report.changed() => {
                self.console
                    .print(&format!(
                        "{} new, {} gone, {} back",
                        report.added.len(),
                        report.disabled.len(),
                        report.restored.len()
                    ))
                    .await
            }
            Ok(_) => self.console.print("Inventory unchanged.").await,
            Err(e) => self.console.print(&format!("Refresh failed: {}", e)).await,
        }
    }

    async fn relabel(&self) {
        match self.engine.relabel_unresolved().await {
            Ok(0) => self.console.print("Every package has a label.").await,
            Ok(count) => {
                let still_missing = self
                    .engine
                    .snapshot()
                    .iter()
                    .filter(|p| !p.has_label())
                    .count();
                self.console
                    .print(&format!(
                        "Retried {} packages, {} still unlabelled.",
                        count, still_missing
                    ))
                    .await
            }
            Err(e) => self.console.print(&format!("Relabel failed: {}", e)).await,
        }
    }

    async fn status(&self) {
        let inventory = self.engine.snapshot();
        let enabled = inventory.iter().filter(|p| p.is_enabled()).count();
        let unlabelled = inventory.iter().filter(|p| !p.has_label()).count();
        self.console
            .print(&format!(
                "Generation {}: {} packages, {} enabled, {} disabled, {} unlabelled",
                inventory.generation(),
                inventory.len(),
                enabled,
                inventory.len() - enabled,
                unlabelled
            ))
            .await;
    }
}
