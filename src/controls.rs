//! High-level entry point bundling registry, transports and settings.
//!
//! # Example
//!
//! ```rust,no_run
//! use reelsource::{MediaDescriptor, Providers, ResolveOptions, ResolverConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ResolverConfig::load()?;
//! let providers = Providers::builder()
//!     .config(&config)
//!     .plugins(reelsource::plugin::load_plugins()?)?
//!     .build()?;
//!
//! let media = MediaDescriptor::movie("Heat", 1995, "949").with_imdb_id("tt0113277");
//! let resolved = providers.resolve(&media, &ResolveOptions::default()).await?;
//! println!("{} stream(s) from {}", resolved.streams.len(), resolved.origin_provider_id);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use anyhow::Result;

use crate::config::ResolverConfig;
use crate::error::{RegistryError, ResolutionError};
use crate::fetch::Fetchers;
use crate::http_client::http_fetchers;
use crate::media::MediaDescriptor;
use crate::plugin::{register_plugins, ProvidersFile};
use crate::provider::{Embed, ProviderKind, ProviderMeta, Source};
use crate::registry::{ListOptions, Registry, RegistryBuilder};
use crate::runner::{Pipeline, PipelineSettings, ResolveOptions, ResolvedMedia};

/// Assembles a [`Providers`].
#[derive(Default)]
pub struct ProvidersBuilder {
    registry: RegistryBuilder,
    fetchers: Option<Fetchers>,
    proxy_url: Option<String>,
    settings: PipelineSettings,
}

impl ProvidersBuilder {
    /// Add a source.
    pub fn source(mut self, source: Arc<dyn Source>) -> Result<Self, RegistryError> {
        self.registry.register_source(source)?;
        Ok(self)
    }

    /// Add an embed.
    pub fn embed(mut self, embed: Arc<dyn Embed>) -> Result<Self, RegistryError> {
        self.registry.register_embed(embed)?;
        Ok(self)
    }

    /// Add every declared external plugin.
    pub fn plugins(mut self, plugins: ProvidersFile) -> Result<Self, RegistryError> {
        register_plugins(&mut self.registry, plugins)?;
        Ok(self)
    }

    /// Apply target, deadlines, subtitle and proxy settings from `config`.
    #[must_use]
    pub fn config(mut self, config: &ResolverConfig) -> Self {
        self.settings = config.to_settings();
        self.proxy_url.clone_from(&config.proxy_url);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use these transports instead of building reqwest ones.
    #[must_use]
    pub fn fetchers(mut self, fetchers: Fetchers) -> Self {
        self.fetchers = Some(fetchers);
        self
    }

    /// Freeze the registry and build the transports if none were given.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn build(self) -> Result<Providers> {
        let fetchers = match self.fetchers {
            Some(fetchers) => fetchers,
            None => http_fetchers(self.proxy_url.as_deref(), self.settings.attempt_timeout)?,
        };
        let registry = Arc::new(self.registry.build());
        Ok(Providers {
            pipeline: Pipeline::new(registry, fetchers, self.settings),
        })
    }
}

/// Registry plus pipeline, with the individual runners.
#[derive(Debug, Clone)]
pub struct Providers {
    pipeline: Pipeline,
}

impl Providers {
    #[must_use]
    pub fn builder() -> ProvidersBuilder {
        ProvidersBuilder::default()
    }

    /// Ranked fallback over every eligible source.
    pub async fn resolve(
        &self,
        media: &MediaDescriptor,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia, ResolutionError> {
        self.pipeline.resolve(media, options).await
    }

    /// Run a single source by id.
    pub async fn run_source(
        &self,
        id: &str,
        media: &MediaDescriptor,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia, ResolutionError> {
        self.pipeline.run_source(id, media, options).await
    }

    /// Run a single embed by id against `location`.
    pub async fn run_embed(
        &self,
        id: &str,
        location: &str,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia, ResolutionError> {
        self.pipeline.run_embed(id, location, None, options).await
    }

    /// Enabled sources in the order `resolve` tries them.
    #[must_use]
    pub fn list_sources(&self) -> Vec<ProviderMeta> {
        self.registry()
            .sources(ListOptions::default())
            .iter()
            .map(|s| s.meta().clone())
            .collect()
    }

    /// Enabled embeds by descending rank.
    #[must_use]
    pub fn list_embeds(&self) -> Vec<ProviderMeta> {
        self.registry()
            .embeds(ListOptions::default())
            .iter()
            .map(|e| e.meta().clone())
            .collect()
    }

    /// Metadata for `id`, looked up among sources first, then embeds.
    #[must_use]
    pub fn metadata(&self, id: &str) -> Option<&ProviderMeta> {
        self.registry()
            .metadata(ProviderKind::Source, id)
            .or_else(|| self.registry().metadata(ProviderKind::Embed, id))
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        self.pipeline.registry()
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
