use anyhow::{bail, Result};

pub const USAGE: &str = "\
Usage: droidsync [--config <path>] [command]

Commands:
  (none)                 Interactive console
  list [query] [--json]  Refresh once and print the inventory
  toggle <package>       Disable a listed package, or re-enable one the
                         listing does not show
  check                  Check adb, the device and the configuration
  init                   Write a default configuration file
  help                   Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Console,
    List { query: Option<String>, json: bool },
    Toggle { id: String },
    Check,
    Init,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: Option<String>,
    pub command: Command,
}

impl Args {
    pub fn from_env() -> Result<Self> {
        Self::parse(std::env::args().skip(1))
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = None;
        let mut positional = Vec::new();
        let mut json = false;

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => config = Some(path),
                    None => bail!("--config requires a path"),
                },
                "--json" => json = true,
                "--help" | "-h" => positional.insert(0, "help".to_string()),
                flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            None => Command::Console,
            Some("list") => Command::List {
                query: positional.next(),
                json,
            },
            Some("toggle") => match positional.next() {
                Some(id) => Command::Toggle { id },
                None => bail!("toggle requires a package name"),
            },
            Some("check") => Command::Check,
            Some("init") => Command::Init,
            Some("help") => Command::Help,
            Some(other) => bail!("Unknown command: {}", other),
        };

        if let Some(extra) = positional.next() {
            bail!("Unexpected argument: {}", extra);
        }

        Ok(Self { config, command })
    }
}
