//! Configuration for the AFK keeper.
//!
//! Settings persist to disk as a RON file, are loaded once at process start,
//! and can be overridden from the command line via clap. [`Config::validate`]
//! rejects settings the session core cannot run with.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AuthMode, BehaviorConfig, Config, DebugConfig, ServerConfig, SessionConfig, ViewDistance,
};
pub use error::ConfigError;
