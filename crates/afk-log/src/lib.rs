//! Structured logging for the AFK keeper.
//!
//! Console output with uptime timestamps and module paths, plus optional JSON
//! file logging for post-mortem analysis of long unattended runs. `RUST_LOG`
//! takes precedence over the configured `debug.log_level`.

use afk_config::Config;
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config says otherwise.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written inside the log directory.
pub const LOG_FILE_NAME: &str = "afk.log";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - Directory for the JSON log file; only used when
///   `debug.file_logging` is enabled in `config`
/// * `config` - Optional configuration providing the log level and file toggle
///
/// ```no_run
/// use afk_config::Config;
/// use afk_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, config: Option<&Config>) {
    let filter_str = filter_directive(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(log_file) = open_log_file(log_dir, config) {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Create the JSON log file when `debug.file_logging` is on and a directory is given.
///
/// Missing parent directories are created. Any I/O failure disables file
/// logging rather than aborting startup.
pub fn open_log_file(log_dir: Option<&Path>, config: Option<&Config>) -> Option<File> {
    if !config.is_some_and(|c| c.debug.file_logging) {
        return None;
    }
    let log_dir = log_dir?;
    std::fs::create_dir_all(log_dir).ok()?;
    File::create(log_dir.join(LOG_FILE_NAME)).ok()
}

/// The filter directive derived from `config`, falling back to [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.clone()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}
