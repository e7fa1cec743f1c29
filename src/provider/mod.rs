//! Capability contracts for source and embed providers.
//!
//! A [`Source`] turns a [`MediaDescriptor`](crate::MediaDescriptor) into
//! streams or embed references. An [`Embed`] turns an opaque location into
//! streams. Both expose their static description through [`Provider::meta`].
//!
//! Site-specific scrapers live outside this crate; they implement these
//! traits (directly, or as external binaries via [`crate::plugin`]).

pub mod context;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::flags::FlagSet;
use crate::media::MediaKind;
use crate::stream::{EmbedResult, SourceResult};

pub use context::RunContext;

/// Which table a provider is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Source,
    Embed,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Embed => f.write_str("embed"),
        }
    }
}

/// Static description of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMeta {
    /// Unique within its kind.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Priority; higher is tried first.
    pub rank: i32,
    /// Disabled providers are never run by the pipeline.
    pub disabled: bool,
    /// Default flags for everything this provider produces.
    pub flags: FlagSet,
    /// Per-attempt deadline overriding the pipeline default.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ProviderMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rank: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank,
            disabled: false,
            flags: FlagSet::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Common surface of sources and embeds.
pub trait Provider: Send + Sync {
    /// Static description used for ranking, filtering and logging.
    fn meta(&self) -> &ProviderMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }
}

/// Top-level provider: media descriptor in, streams or embeds out.
#[async_trait]
pub trait Source: Provider {
    /// Whether this source can resolve media of `kind`. Unsupported kinds
    /// are filtered out before a run starts.
    fn supports(&self, _kind: MediaKind) -> bool {
        true
    }

    /// Resolve a movie. `ctx.media()` is a [`MediaDescriptor::Movie`](crate::MediaDescriptor::Movie).
    async fn resolve_movie(&self, ctx: &RunContext) -> Result<SourceResult, ProviderError>;

    /// Resolve an episode. `ctx.media()` is a [`MediaDescriptor::Episode`](crate::MediaDescriptor::Episode).
    async fn resolve_episode(&self, ctx: &RunContext) -> Result<SourceResult, ProviderError>;
}

/// Second-stage provider: opaque location in, streams out.
#[async_trait]
pub trait Embed: Provider {
    /// Resolve `ctx.location()`.
    async fn resolve(&self, ctx: &RunContext) -> Result<EmbedResult, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{flag_set, CapabilityFlag};

    #[test]
    fn meta_builder() {
        let meta = ProviderMeta::new("vidsrc", "VidSrc", 260)
            .with_flags(flag_set(&[CapabilityFlag::CorsAllowed]))
            .with_timeout(Duration::from_secs(5))
            .disabled();
        assert_eq!(meta.rank, 260);
        assert!(meta.disabled);
        assert!(meta.flags.contains(&CapabilityFlag::CorsAllowed));
        assert_eq!(meta.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn kind_display() {
        assert_eq!(ProviderKind::Source.to_string(), "source");
        assert_eq!(ProviderKind::Embed.to_string(), "embed");
    }
}
