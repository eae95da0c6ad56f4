use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, de::DeserializeOwned};
use tracing::{info, warn};

/// Configuration for [`NotificationManager`](crate::NotificationManager).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Upper bound on how long `initialize` waits for a launch activation.
    pub launch_wait_ms: u64,
    /// Capacity of the event broadcast channel.
    ///
    /// A subscriber that falls this many events behind loses the oldest
    /// ones and sees `RecvError::Lagged`. The manager logs a warning when the
    /// channel is full.
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            launch_wait_ms: 5_000,
            event_capacity: 256,
        }
    }
}

impl ManagerConfig {
    pub fn launch_wait(&self) -> Duration {
        Duration::from_millis(self.launch_wait_ms)
    }
}

/// `$XDG_CONFIG_HOME/herald/config.toml`, or `~/.config/herald/config.toml`.
pub fn default_config_path() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))
        .unwrap_or_default();
    base.join("herald").join("config.toml")
}

/// Reads a TOML config file, falling back to `T::default()`.
///
/// A missing file is expected and logged at `info`; unreadable or malformed
/// files are logged at `warn`.
pub fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file; using defaults");
            return T::default();
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "config file unreadable; using defaults");
            return T::default();
        }
    };

    match toml::from_str(&raw) {
        Ok(cfg) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "config file malformed; using defaults");
            T::default()
        }
    }
}
