use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry parameters for the final status write (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistRetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for PersistRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

/// Global configuration loaded from `~/.config/isofetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Number of concurrent download workers.
    pub workers: usize,
    /// Capacity of the job queue; submitters wait when it is full.
    pub queue_capacity: usize,
    /// Served directory that completed images are published into.
    /// Defaults to `~/.local/share/isofetch/images`.
    #[serde(default)]
    pub publish_dir: Option<PathBuf>,
    /// Directory for in-progress `.part` files. Must be on the same filesystem
    /// as `publish_dir`; defaults to `<publish_dir>/.partial`.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// TCP/TLS connect timeout for payload and checksum requests.
    pub connect_timeout_secs: u64,
    /// Total deadline for fetching a checksum file.
    pub checksum_timeout_secs: u64,
    /// How long shutdown waits for workers before logging a warning.
    pub shutdown_grace_secs: u64,
    /// Optional retry policy for terminal status writes; built-in defaults otherwise.
    #[serde(default)]
    pub persist_retry: Option<PersistRetryConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 64,
            publish_dir: None,
            scratch_dir: None,
            connect_timeout_secs: 30,
            checksum_timeout_secs: 30,
            shutdown_grace_secs: 30,
            persist_retry: None,
        }
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn checksum_timeout(&self) -> Duration {
        Duration::from_secs(self.checksum_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("isofetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// `~/.local/share/isofetch/images`
pub fn default_publish_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("isofetch")?;
    Ok(xdg_dirs.get_data_home().join("images"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
