#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! In-memory device and console for the app tests.

use async_trait::async_trait;
use droidsync_bridge::{ChannelError, CommandChannel};
use droidsync_interfaces::Console;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Device that answers from a reply table and keeps pushed files.
#[derive(Default)]
pub struct FakeDevice {
    replies: Mutex<HashMap<String, String>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, command: &str, output: &str) {
        self.replies
            .lock()
            .insert(command.to_string(), output.to_string());
    }

    pub fn listing(&self, packages: &[(&str, &str)]) {
        let text: String = packages
            .iter()
            .map(|(path, id)| format!("package:{}={}\n", path, id))
            .collect();
        self.reply("pm list packages -f", &text);
    }

    pub fn file(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(remote_path).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandChannel for FakeDevice {
    async fn run(&self, command: &str) -> Result<String, ChannelError> {
        self.calls.lock().push(command.to_string());
        self.replies
            .lock()
            .get(command)
            .cloned()
            .ok_or_else(|| ChannelError::ExecutionFailed(format!("{}: not found", command)))
    }

    async fn write(&self, remote_path: &str, content: &[u8]) -> Result<(), ChannelError> {
        self.files
            .lock()
            .insert(remote_path.to_string(), content.to_vec());
        Ok(())
    }
}

/// Console fed from a script; records everything printed.
#[derive(Default)]
pub struct ScriptedConsole {
    input: Mutex<VecDeque<String>>,
    answers: Mutex<VecDeque<bool>>,
    output: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Arc<Self> {
        let console = Self::default();
        console
            .input
            .lock()
            .extend(lines.iter().map(|line| line.to_string()));
        Arc::new(console)
    }

    pub fn answer(&self, yes: bool) {
        self.answers.lock().push_back(yes);
    }

    pub fn output(&self) -> Vec<String> {
        self.output.lock().clone()
    }

    pub fn last(&self) -> String {
        self.output.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&self, _prompt: &str) -> Option<String> {
        self.input.lock().pop_front()
    }

    async fn print(&self, message: &str) {
        self.output.lock().push(message.to_string());
    }

    async fn confirm(&self, question: &str) -> bool {
        self.output.lock().push(question.to_string());
        self.answers.lock().pop_front().unwrap_or(false)
    }
}
