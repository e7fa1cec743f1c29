pub mod output;
pub mod providers;
pub mod resolve;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use reelsource::plugin::{load_plugins, load_plugins_from};
use reelsource::{MediaDescriptor, Providers, ResolverConfig};

/// Config file overrides from the global flags.
pub struct Paths {
    pub config: Option<PathBuf>,
    pub providers: Option<PathBuf>,
}

impl Paths {
    pub fn load_config(&self) -> Result<ResolverConfig> {
        match &self.config {
            Some(path) => ResolverConfig::load_from(path),
            None => ResolverConfig::load(),
        }
    }

    /// Build the facade from the config and provider files.
    pub fn providers(&self, config: &ResolverConfig) -> Result<Providers> {
        let plugins = match &self.providers {
            Some(path) => load_plugins_from(path)?,
            None => load_plugins()?,
        };
        Providers::builder().config(config).plugins(plugins)?.build()
    }
}

/// Media selection flags shared by `resolve` and `source`.
#[derive(Args)]
pub struct MediaArgs {
    /// Title
    #[arg(long)]
    pub title: String,

    /// Release year
    #[arg(long)]
    pub year: u16,

    /// TMDB id
    #[arg(long)]
    pub tmdb: String,

    /// IMDb id (enables the supplemental subtitle lookup)
    #[arg(long)]
    pub imdb: Option<String>,

    /// Season number (requires --episode)
    #[arg(long)]
    pub season: Option<u32>,

    /// Episode number (requires --season)
    #[arg(long)]
    pub episode: Option<u32>,
}

impl MediaArgs {
    pub fn descriptor(&self) -> Result<MediaDescriptor> {
        let media = match (self.season, self.episode) {
            (Some(season), Some(episode)) => {
                MediaDescriptor::episode(&self.title, self.year, &self.tmdb, season, episode)
            }
            (None, None) => MediaDescriptor::movie(&self.title, self.year, &self.tmdb),
            _ => bail!("--season and --episode must be given together"),
        };
        Ok(match &self.imdb {
            Some(imdb) => media.with_imdb_id(imdb),
            None => media,
        })
    }
}

/// Token cancelled on Ctrl-C.
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });
    token
}
