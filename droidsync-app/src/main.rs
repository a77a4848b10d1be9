use anyhow::Result;
use droidsync_app::cli::{Args, Command, USAGE};
use droidsync_app::{commands, logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config_path = Config::resolve_path(args.config.as_deref());
    match args.command {
        Command::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        Command::Init => return commands::init::run(&config_path),
        _ => {}
    }

    let config = Config::load_or_default(&config_path)?;
    logging::init(&config.log)?;
    tracing::debug!("Using configuration {}", config_path.display());

    if let Command::Check = args.command {
        return commands::health::run(&config).await;
    }

    let channel = commands::connect(&config).await?;
    let result = match args.command {
        Command::List { query, json } => {
            commands::list::run(&config, channel.clone(), query.as_deref(), json).await
        }
        Command::Toggle { id } => commands::toggle::run(&config, channel.clone(), &id)
            .await
            .map(|_| ()),
        _ => commands::run::run(&config, channel.clone()).await,
    };

    if config.device.kill_server_on_exit {
        if let Err(e) = channel.kill_server().await {
            tracing::warn!("Failed to stop adb server: {}", e);
        }
    }
    result
}
