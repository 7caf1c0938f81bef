//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Which server to join and how to identify.
    pub server: ServerConfig,
    /// Reconnect and liveness timings.
    pub session: SessionConfig,
    /// Idle-action pacing and chat replies.
    pub behavior: BehaviorConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Requested client view distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViewDistance {
    /// Let the server pick its normal distance.
    Normal,
    /// Explicit distance in chunks.
    Chunks(u8),
}

/// How the client authenticates during login.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthMode {
    /// No credentials; the server trusts the username.
    #[default]
    Offline,
    /// Pre-issued access token.
    Token(String),
}

/// Server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Username the bot logs in with. Also the name chat mentions are matched against.
    pub username: String,
    /// Protocol version string sent at login. Required: auto-detection is
    /// unreliable against some hosts.
    pub version: String,
    /// Optional view distance request.
    pub view_distance: Option<ViewDistance>,
    /// Authentication mode.
    pub auth: AuthMode,
    /// Interval of the transport's own keepalive check, in milliseconds.
    pub liveness_check_interval_ms: u64,
}

/// Session-resilience timings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Silence after which the liveness watchdog terminates the connection.
    pub watchdog_timeout_ms: u64,
    /// Reconnect delay when the failed attempt never reached the established state.
    pub never_established_backoff_ms: u64,
    /// Reconnect delay after an attempt that was established at least once.
    pub established_backoff_ms: u64,
    /// Pause between establishment and the first idle action.
    pub settle_delay_ms: u64,
}

/// Idle-action pacing and chat reply settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Lower bound (inclusive) of the delay between idle actions.
    pub action_delay_min_ms: u64,
    /// Upper bound (exclusive) of the delay between idle actions.
    pub action_delay_max_ms: u64,
    /// Radius in blocks around the bot used to pick wander targets.
    pub wander_radius: f64,
    /// Minimum time between two chat replies.
    pub reply_cooldown_ms: u64,
    /// Lower bound (inclusive) of the typing delay before a reply is sent.
    pub reply_delay_min_ms: u64,
    /// Upper bound (exclusive) of the typing delay before a reply is sent.
    pub reply_delay_max_ms: u64,
    /// Replies picked from when someone mentions the bot.
    pub replies: Vec<String>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "afk_core=trace").
    pub log_level: String,
    /// Also write JSON logs to the platform log directory.
    pub file_logging: bool,
}

// --- Default implementations ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 25565,
            username: "afk_keeper".to_string(),
            version: "1.20.4".to_string(),
            view_distance: None,
            auth: AuthMode::Offline,
            liveness_check_interval_ms: 30_000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout_ms: 45_000,
            never_established_backoff_ms: 300_000,
            established_backoff_ms: 10_000,
            settle_delay_ms: 3_000,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            action_delay_min_ms: 2_000,
            action_delay_max_ms: 7_000,
            wander_radius: 8.0,
            reply_cooldown_ms: 30_000,
            reply_delay_min_ms: 1_500,
            reply_delay_max_ms: 4_500,
            replies: ["hm?", "yeah?", "what's up", "one sec", "busy rn, sorry"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logging: false,
        }
    }
}

// --- Duration accessors ---

impl SessionConfig {
    /// Watchdog silence timeout.
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Long backoff tier.
    pub fn never_established_backoff(&self) -> Duration {
        Duration::from_millis(self.never_established_backoff_ms)
    }

    /// Short backoff tier.
    pub fn established_backoff(&self) -> Duration {
        Duration::from_millis(self.established_backoff_ms)
    }

    /// Settle delay before the first idle action.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl BehaviorConfig {
    /// Cooldown between chat replies.
    pub fn reply_cooldown(&self) -> Duration {
        Duration::from_millis(self.reply_cooldown_ms)
    }
}

// --- Load / Save / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                    path: config_path.clone(),
                    source,
                })?;
            let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Check that every setting is usable. Called once after CLI overrides
    /// have been applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.server.host.trim().is_empty() {
            return invalid("server.host", "must not be empty");
        }
        if self.server.username.trim().is_empty() {
            return invalid("server.username", "must not be empty");
        }
        if self.server.version.trim().is_empty() {
            return invalid("server.version", "must be set explicitly");
        }
        if self.server.liveness_check_interval_ms == 0 {
            return invalid("server.liveness_check_interval_ms", "must be positive");
        }
        if self.session.watchdog_timeout_ms == 0 {
            return invalid("session.watchdog_timeout_ms", "must be positive");
        }
        if self.behavior.action_delay_min_ms >= self.behavior.action_delay_max_ms {
            return invalid("behavior.action_delay_min_ms", "must be below action_delay_max_ms");
        }
        if self.behavior.reply_delay_min_ms >= self.behavior.reply_delay_max_ms {
            return invalid("behavior.reply_delay_min_ms", "must be below reply_delay_max_ms");
        }
        if !(self.behavior.wander_radius > 0.0) {
            return invalid("behavior.wander_radius", "must be positive");
        }
        if self.behavior.replies.is_empty() {
            return invalid("behavior.replies", "needs at least one reply");
        }
        Ok(())
    }
}
