use async_trait::async_trait;

/// Line-oriented operator console.
#[async_trait]
pub trait Console: Send + Sync {
    /// Shows `prompt` and reads one trimmed line. `None` at end of input.
    async fn read_line(&self, prompt: &str) -> Option<String>;
    async fn print(&self, message: &str);
    /// Asks a yes/no question; anything but an answer starting with `y` is no.
    async fn confirm(&self, question: &str) -> bool;
}
