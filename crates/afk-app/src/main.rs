//! `afk`: keeps one player logged in to a game server.

mod platform;

use afk_config::{CliArgs, Config};
use afk_core::{Bot, BotSettings};
use afk_net::{ConnectOptions, TcpConnector};
use clap::Parser;

use crate::platform::PlatformDirs;

fn main() {
    let args = CliArgs::parse();

    let dirs = PlatformDirs::resolve_for(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to resolve platform directories: {e}");
        std::process::exit(1);
    });
    if let Err(e) = dirs.create_dirs() {
        eprintln!("Failed to create platform directories: {e}");
        std::process::exit(1);
    }

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    afk_log::init_logging(Some(&dirs.log_dir), Some(&config));
    tracing::info!("Config directory: {}", dirs.config_dir.display());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(
        TcpConnector::default(),
        ConnectOptions::from_config(&config.server),
        BotSettings::from_config(&config),
    );
    runtime.block_on(bot.run());
}
