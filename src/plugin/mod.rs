//! External plugin providers.
//!
//! Site scrapers can live outside the crate as standalone binaries.
//! Protocol: the binary receives JSON on stdin and returns JSON on stdout.
//!
//! # Configuration
//!
//! Plugins are declared in `~/.config/reelsource/providers.toml`:
//!
//! ```toml
//! [[sources]]
//! id = "vidlink"
//! name = "VidLink"
//! rank = 50
//! binary = "/usr/local/bin/reelsource-vidlink"
//! flags = ["cors-allowed"]
//! kinds = ["movie", "episode"]
//!
//! [[embeds]]
//! id = "upcloud"
//! rank = 20
//! binary = "/usr/local/bin/reelsource-upcloud"
//! timeout_secs = 10
//! ```
//!
//! # Protocol
//!
//! Input (JSON on stdin):
//! ```json
//! {"op": "movie", "media": {"type": "movie", "title": "Heat", "releaseYear": 1995, "tmdbId": "949"}}
//! {"op": "embed", "location": "https://upcloud.example/e/abc"}
//! ```
//!
//! Output (JSON on stdout), either a result:
//! ```json
//! {"streams": [{"type": "hls", "id": "main", "playlist": "https://cdn.example/x.m3u8"}],
//!  "embeds": [{"embedId": "upcloud", "location": "https://upcloud.example/e/abc"}]}
//! ```
//! or an error:
//! ```json
//! {"error": {"kind": "not_found", "message": "no such title"}}
//! ```
//!
//! A non-zero exit status or unparseable output counts as a fault.

pub mod config;
pub mod runner;

use std::sync::Arc;

pub use config::{load_plugins, load_plugins_from, PluginConfig, ProvidersFile};
pub use runner::{PluginEmbed, PluginSource};

use crate::error::RegistryError;
use crate::registry::RegistryBuilder;

/// Register every declared plugin.
///
/// # Errors
///
/// [`RegistryError::DuplicateId`] if two plugins of one kind share an id,
/// or clash with a provider already in `builder`.
pub fn register_plugins(builder: &mut RegistryBuilder, plugins: ProvidersFile) -> Result<(), RegistryError> {
    for config in plugins.sources {
        builder.register_source(Arc::new(PluginSource::new(config)))?;
    }
    for config in plugins.embeds {
        builder.register_embed(Arc::new(PluginEmbed::new(config)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use crate::registry::Registry;

    #[test]
    fn duplicate_plugin_ids_rejected() {
        let toml_str = r#"
[[sources]]
id = "same"
binary = "/bin/a"

[[sources]]
id = "same"
binary = "/bin/b"
"#;
        let plugins: ProvidersFile = toml::from_str(toml_str).unwrap();
        let mut builder = Registry::builder();
        let err = register_plugins(&mut builder, plugins).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                kind: ProviderKind::Source,
                id: "same".into()
            }
        );
    }

    #[test]
    fn plugins_land_in_their_tables() {
        let toml_str = r#"
[[sources]]
id = "s"
rank = 3
binary = "/bin/s"

[[embeds]]
id = "e"
binary = "/bin/e"
"#;
        let plugins: ProvidersFile = toml::from_str(toml_str).unwrap();
        let mut builder = Registry::builder();
        register_plugins(&mut builder, plugins).unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(ProviderKind::Source), 1);
        assert_eq!(registry.len(ProviderKind::Embed), 1);
        assert_eq!(registry.metadata(ProviderKind::Source, "s").unwrap().rank, 3);
    }
}
