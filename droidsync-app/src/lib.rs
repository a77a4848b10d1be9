//! Command-line front end for the package inventory engine.

pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod session;

pub use config::Config;
pub use session::{Flow, Session};
