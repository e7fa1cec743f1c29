//! Provider registry.
//!
//! Providers are registered once through a [`RegistryBuilder`]; the built
//! [`Registry`] has no mutation API and can be shared freely behind an
//! `Arc` by concurrent runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reelsource::registry::{ListOptions, Registry};
//! use reelsource::Provider;
//! # fn sources() -> Vec<Arc<dyn reelsource::Source>> { vec![] }
//!
//! # fn main() -> Result<(), reelsource::RegistryError> {
//! let mut builder = Registry::builder();
//! for source in sources() {
//!     builder.register_source(source)?;
//! }
//! let registry = builder.build();
//! for source in registry.sources(ListOptions::default()) {
//!     println!("{} ({})", source.meta().name, source.meta().rank);
//! }
//! # Ok(())
//! # }
//! ```

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::provider::{Embed, Provider, ProviderKind, ProviderMeta, Source};

/// Filters for [`Registry::sources`] / [`Registry::embeds`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Include providers marked disabled.
    pub include_disabled: bool,
}

/// Providers of one kind in registration order.
struct Table<P: ?Sized> {
    kind: ProviderKind,
    entries: Vec<Arc<P>>,
}

impl<P: ?Sized + Provider> Table<P> {
    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, provider: Arc<P>) -> Result<(), RegistryError> {
        if self.get(provider.id()).is_some() {
            return Err(RegistryError::DuplicateId {
                kind: self.kind,
                id: provider.id().to_string(),
            });
        }
        self.entries.push(provider);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&Arc<P>> {
        self.entries.iter().find(|p| p.id() == id)
    }

    /// Descending rank; the sort is stable, so equal ranks keep
    /// registration order.
    fn ranked(&self, options: ListOptions) -> Vec<Arc<P>> {
        let mut list: Vec<Arc<P>> = self
            .entries
            .iter()
            .filter(|p| options.include_disabled || !p.meta().disabled)
            .cloned()
            .collect();
        list.sort_by_key(|p| Reverse(p.meta().rank));
        list
    }
}

/// Builder that collects providers before the registry is frozen.
pub struct RegistryBuilder {
    sources: Table<dyn Source>,
    embeds: Table<dyn Embed>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            sources: Table::new(ProviderKind::Source),
            embeds: Table::new(ProviderKind::Embed),
        }
    }
}

impl RegistryBuilder {
    /// Register a source provider.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateId`] if a source with the same id exists.
    pub fn register_source(&mut self, source: Arc<dyn Source>) -> Result<&mut Self, RegistryError> {
        self.sources.insert(source)?;
        Ok(self)
    }

    /// Register an embed provider.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateId`] if an embed with the same id exists.
    pub fn register_embed(&mut self, embed: Arc<dyn Embed>) -> Result<&mut Self, RegistryError> {
        self.embeds.insert(embed)?;
        Ok(self)
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            sources: self.sources,
            embeds: self.embeds,
        }
    }
}

/// Immutable table of registered providers.
pub struct Registry {
    sources: Table<dyn Source>,
    embeds: Table<dyn Embed>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Sources ordered by descending rank, ties in registration order.
    #[must_use]
    pub fn sources(&self, options: ListOptions) -> Vec<Arc<dyn Source>> {
        self.sources.ranked(options)
    }

    /// Embeds ordered by descending rank, ties in registration order.
    #[must_use]
    pub fn embeds(&self, options: ListOptions) -> Vec<Arc<dyn Embed>> {
        self.embeds.ranked(options)
    }

    /// Look up a source by id, disabled or not.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<Arc<dyn Source>> {
        self.sources.get(id).cloned()
    }

    /// Look up an embed by id, disabled or not.
    #[must_use]
    pub fn embed(&self, id: &str) -> Option<Arc<dyn Embed>> {
        self.embeds.get(id).cloned()
    }

    /// Metadata of a provider of `kind`.
    #[must_use]
    pub fn metadata(&self, kind: ProviderKind, id: &str) -> Option<&ProviderMeta> {
        match kind {
            ProviderKind::Source => self.sources.get(id).map(|p| p.meta()),
            ProviderKind::Embed => self.embeds.get(id).map(|p| p.meta()),
        }
    }

    /// Number of registered providers of `kind`.
    #[must_use]
    pub fn len(&self, kind: ProviderKind) -> usize {
        match kind {
            ProviderKind::Source => self.sources.entries.len(),
            ProviderKind::Embed => self.embeds.entries.len(),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = |entries: Vec<&str>| entries.join(", ");
        f.debug_struct("Registry")
            .field("sources", &ids(self.sources.entries.iter().map(|p| p.id()).collect()))
            .field("embeds", &ids(self.embeds.entries.iter().map(|p| p.id()).collect()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::ProviderError;
    use crate::provider::RunContext;
    use crate::stream::{EmbedResult, SourceResult};

    struct Dummy(ProviderMeta);

    impl Provider for Dummy {
        fn meta(&self) -> &ProviderMeta {
            &self.0
        }
    }

    #[async_trait]
    impl Source for Dummy {
        async fn resolve_movie(&self, _ctx: &RunContext) -> Result<SourceResult, ProviderError> {
            Ok(SourceResult::default())
        }

        async fn resolve_episode(&self, _ctx: &RunContext) -> Result<SourceResult, ProviderError> {
            Ok(SourceResult::default())
        }
    }

    #[async_trait]
    impl Embed for Dummy {
        async fn resolve(&self, _ctx: &RunContext) -> Result<EmbedResult, ProviderError> {
            Ok(EmbedResult::default())
        }
    }

    fn dummy(id: &str, rank: i32) -> Arc<Dummy> {
        Arc::new(Dummy(ProviderMeta::new(id, id, rank)))
    }

    fn ids<P: ?Sized + Provider>(list: &[Arc<P>]) -> Vec<String> {
        list.iter().map(|p| p.id().to_string()).collect()
    }

    #[test]
    fn sources_sorted_by_descending_rank() {
        let mut builder = Registry::builder();
        builder.register_source(dummy("low", 10)).unwrap();
        builder.register_source(dummy("high", 50)).unwrap();
        builder.register_source(dummy("mid", 30)).unwrap();
        let registry = builder.build();
        assert_eq!(ids(&registry.sources(ListOptions::default())), ["high", "mid", "low"]);
    }

    #[test]
    fn equal_ranks_keep_registration_order() {
        let mut builder = Registry::builder();
        for id in ["b", "a", "c"] {
            builder.register_source(dummy(id, 7)).unwrap();
        }
        let registry = builder.build();
        for _ in 0..3 {
            assert_eq!(ids(&registry.sources(ListOptions::default())), ["b", "a", "c"]);
        }
    }

    #[test]
    fn duplicate_ids_rejected_per_kind() {
        let mut builder = Registry::builder();
        builder.register_source(dummy("x", 1)).unwrap();
        let err = builder.register_source(dummy("x", 2)).err().unwrap();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                kind: ProviderKind::Source,
                id: "x".into()
            }
        );
        // Same id in the other table is fine.
        builder.register_embed(dummy("x", 1)).unwrap();
    }

    #[test]
    fn disabled_hidden_unless_requested() {
        let mut builder = Registry::builder();
        builder
            .register_embed(Arc::new(Dummy(ProviderMeta::new("off", "Off", 99).disabled())))
            .unwrap();
        builder.register_embed(dummy("on", 1)).unwrap();
        let registry = builder.build();
        assert_eq!(ids(&registry.embeds(ListOptions::default())), ["on"]);
        assert_eq!(
            ids(&registry.embeds(ListOptions {
                include_disabled: true
            })),
            ["off", "on"]
        );
        assert!(registry.embed("off").is_some());
        assert!(registry.embed("missing").is_none());
        assert_eq!(registry.metadata(ProviderKind::Embed, "off").unwrap().rank, 99);
        assert_eq!(registry.len(ProviderKind::Embed), 2);
    }
}
