//! Plugin declarations loaded from `~/.config/reelsource/providers.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::config_path;
use crate::flags::FlagSet;
use crate::media::MediaKind;
use crate::provider::ProviderMeta;

/// One external provider binary.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    /// Unique id within its table.
    pub id: String,
    /// Display name; defaults to the id.
    pub name: Option<String>,
    #[serde(default)]
    pub rank: i32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub flags: FlagSet,
    /// Path to the plugin binary.
    pub binary: PathBuf,
    /// Extra arguments passed before any protocol input.
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-attempt deadline overriding the pipeline default.
    pub timeout_secs: Option<u64>,
    /// Media kinds a source plugin handles; all when absent.
    pub kinds: Option<Vec<MediaKind>>,
}

impl PluginConfig {
    /// Registry metadata for this plugin.
    #[must_use]
    pub fn meta(&self) -> ProviderMeta {
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        let mut meta = ProviderMeta::new(&self.id, name, self.rank).with_flags(self.flags.clone());
        meta.disabled = self.disabled;
        if let Some(secs) = self.timeout_secs {
            meta = meta.with_timeout(Duration::from_secs(secs));
        }
        meta
    }
}

/// Top-level providers file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersFile {
    #[serde(default)]
    pub sources: Vec<PluginConfig>,
    #[serde(default)]
    pub embeds: Vec<PluginConfig>,
}

impl ProvidersFile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.embeds.is_empty()
    }
}

/// Load plugin declarations from the default location.
///
/// Returns an empty file if it doesn't exist (plugins are optional).
pub fn load_plugins() -> Result<ProvidersFile> {
    load_plugins_from(&config_path("providers.toml"))
}

/// Load plugin declarations from `path`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_plugins_from(path: &Path) -> Result<ProvidersFile> {
    if !path.exists() {
        return Ok(ProvidersFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::CapabilityFlag;

    #[test]
    fn parse_empty_config() {
        let file: ProvidersFile = toml::from_str("").unwrap();
        assert!(file.is_empty());
    }

    #[test]
    fn parse_sources_and_embeds() {
        let toml_str = r#"
[[sources]]
id = "vidlink"
name = "VidLink"
rank = 50
binary = "/usr/local/bin/reelsource-vidlink"
flags = ["cors-allowed"]
timeout_secs = 15
kinds = ["movie"]

[[embeds]]
id = "upcloud"
binary = "/usr/local/bin/reelsource-upcloud"
disabled = true
"#;
        let file: ProvidersFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.sources.len(), 1);
        assert_eq!(file.embeds.len(), 1);

        let source = file.sources[0].meta();
        assert_eq!(source.name, "VidLink");
        assert_eq!(source.rank, 50);
        assert!(source.flags.contains(&CapabilityFlag::CorsAllowed));
        assert_eq!(source.timeout, Some(Duration::from_secs(15)));
        assert_eq!(file.sources[0].kinds.as_deref(), Some(&[MediaKind::Movie][..]));

        let embed = file.embeds[0].meta();
        assert_eq!(embed.name, "upcloud");
        assert!(embed.disabled);
        assert_eq!(embed.rank, 0);
    }

    #[test]
    fn rejects_unknown_flag() {
        let toml_str = r#"
[[sources]]
id = "x"
binary = "/bin/x"
flags = ["teleport"]
"#;
        assert!(toml::from_str::<ProvidersFile>(toml_str).is_err());
    }

    #[test]
    fn missing_file_is_empty() {
        let file = load_plugins_from(Path::new("/nonexistent/providers.toml")).unwrap();
        assert!(file.is_empty());
    }
}
