//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// AFK keeper command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "afk", version, about = "Keeps a game session alive and looking busy")]
pub struct CliArgs {
    /// Server host.
    #[arg(long)]
    pub host: Option<String>,

    /// Server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Username to log in with.
    #[arg(long)]
    pub username: Option<String>,

    /// Protocol version string sent at login.
    #[arg(long = "server-version")]
    pub server_version: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref name) = args.username {
            self.server.username = name.clone();
        }
        if let Some(ref version) = args.server_version {
            self.server.version = version.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
