pub mod terminal;
pub mod traits;

pub use terminal::TerminalConsole;
pub use traits::Console;
