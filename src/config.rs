//! Resolver configuration loaded from `~/.config/reelsource/config.toml`.
//!
//! ```toml
//! target = "browser-extension"
//! consistent_ip = false
//! proxy_url = "https://proxy.example.workers.dev/"
//! attempt_timeout_secs = 15
//! mode = "collect-all"
//!
//! [subtitles]
//! enabled = true
//! endpoint = "https://subs.example.net/search"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::captions::opensubtitles::DEFAULT_ENDPOINT;
use crate::captions::SubtitleIndex;
use crate::flags::Target;
use crate::runner::{PipelineSettings, ResolveMode};

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "reelsource";

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Consumer environment.
    pub target: Target,
    /// Whether the consumer shares the resolving network.
    pub consistent_ip: bool,
    /// Base URL of the CORS proxy; the proxied transport is direct without it.
    pub proxy_url: Option<String>,
    pub attempt_timeout_secs: u64,
    pub cancel_grace_ms: u64,
    /// Heartbeat tick; unset disables the heartbeat.
    pub heartbeat_ms: Option<u64>,
    /// Default mode for `resolve`.
    pub mode: ResolveMode,
    pub subtitles: SubtitlesConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            target: Target::Native,
            consistent_ip: true,
            proxy_url: None,
            attempt_timeout_secs: 20,
            cancel_grace_ms: 2000,
            heartbeat_ms: None,
            mode: ResolveMode::FirstSuccess,
            subtitles: SubtitlesConfig::default(),
        }
    }
}

/// `[subtitles]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitlesConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for SubtitlesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path("config.toml"))
    }

    /// Load from `path`, falling back to defaults when it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Pipeline settings implied by this configuration.
    #[must_use]
    pub fn to_settings(&self) -> PipelineSettings {
        PipelineSettings {
            target: self.target,
            consistent_ip: self.consistent_ip,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            cancel_grace: Duration::from_millis(self.cancel_grace_ms),
            heartbeat: self.heartbeat_ms.map(Duration::from_millis),
            subtitles: self
                .subtitles
                .enabled
                .then(|| SubtitleIndex::new(self.subtitles.endpoint.clone())),
        }
    }
}

/// Path of `file` inside the reelsource config directory.
#[must_use]
pub fn config_path(file: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(file)
}
