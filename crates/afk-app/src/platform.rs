//! Platform directory resolution.
//!
//! The keeper stores its `config.ron` and log files in the OS-conventional
//! per-user locations (XDG on Linux, Known Folders on Windows, Library on
//! macOS). A `--config` directory on the command line replaces both roots.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while preparing directories.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,
    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Directories the keeper reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Holds the JSON log file when file logging is on.
    pub log_dir: PathBuf,
}

pub const APP_NAME: &str = "afk-keeper";

impl PlatformDirs {
    /// Resolve the OS-specific directories without creating them.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoConfigDir`] if the OS does not expose a
    /// configuration directory.
    pub fn resolve() -> Result<Self, PlatformError> {
        let app_config = dirs::config_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME);
        let log_dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .map(|base| base.join(APP_NAME).join("logs"))
            .unwrap_or_else(|| app_config.join("logs"));
        Ok(Self {
            config_dir: app_config,
            log_dir,
        })
    }

    /// Directories rooted under a caller-chosen base, as used for `--config`.
    pub fn resolve_with_root(root: &Path) -> Self {
        Self {
            config_dir: root.to_path_buf(),
            log_dir: root.join("logs"),
        }
    }

    /// Use `root` when given, the OS locations otherwise.
    pub fn resolve_for(root: Option<&Path>) -> Result<Self, PlatformError> {
        match root {
            Some(root) => Ok(Self::resolve_with_root(root)),
            None => Self::resolve(),
        }
    }

    /// Create all directories on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
