use crate::traits::Console;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

pub struct TerminalConsole {
    stdin: Mutex<BufReader<Stdin>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn write(&self, text: &str) {
        let mut stdout = tokio::io::stdout();
        let _ = stdout.write_all(text.as_bytes()).await;
        let _ = stdout.flush().await;
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        self.write(prompt).await;

        let mut line = String::new();
        let mut stdin = self.stdin.lock().await;
        match stdin.read_line(&mut line).await {
            Ok(0) => None, // EOF
            Ok(_) => Some(line.trim().to_string()),
            Err(_) => None,
        }
    }

    async fn print(&self, message: &str) {
        self.write(&format!("{}\n", message)).await;
    }

    async fn confirm(&self, question: &str) -> bool {
        match self.read_line(&format!("{} (y/n): ", question)).await {
            Some(answer) => answer.to_lowercase().starts_with('y'),
            None => false,
        }
    }
}
