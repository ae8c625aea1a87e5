//! Console configuration file.
//!
//! Loaded from `~/.config/runscope/config.toml` (or an explicit
//! `--config` path). A missing file means defaults; a present but
//! malformed file is an error, silently falling back would hide typos.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use runscope_graph::{LayoutConfig, MergeConfig};
use runscope_stream::{RecoveryPolicy, StreamConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Backend base URL the SSE stream is opened against.
    pub backend_url: String,
    /// Max reconnect attempts within the sliding window.
    pub reconnect_max_attempts: u32,
    /// Sliding recovery window in seconds.
    pub reconnect_window_secs: u64,
    /// Pause before an allowed reconnect, in milliseconds.
    pub reconnect_backoff_ms: u64,
    /// Layered layout tuning.
    pub layout: LayoutConfig,
    /// Merged-tree visual proportions.
    pub merge: MergeConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080/api".to_string(),
            reconnect_max_attempts: runscope_protocol::DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_window_secs: runscope_protocol::DEFAULT_RECONNECT_WINDOW_SECS,
            reconnect_backoff_ms: 2000,
            layout: LayoutConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("runscope").join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`. A
    /// missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            base_url: self.backend_url.clone(),
            policy: RecoveryPolicy {
                max_attempts: self.reconnect_max_attempts,
                window: Duration::from_secs(self.reconnect_window_secs),
            },
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
        }
    }
}
