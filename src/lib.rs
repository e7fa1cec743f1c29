//! `reelsource` - provider resolution engine for streaming media
//!
//! Turns a movie or episode descriptor into playable streams by querying a
//! ranked set of third-party providers.
//!
//! # Features
//!
//! - **Ranked fallback**: sources are tried one at a time by descending rank;
//!   failures are recorded and the next source runs
//! - **Embed indirection**: sources may answer with references that a second
//!   stage of embed providers resolves
//! - **Transport selection**: direct vs proxied fetching from per-endpoint
//!   capability flags and the execution target
//! - **Caption aggregation**: per-language deduplication across providers plus
//!   a supplemental subtitle index
//! - **Bounded attempts**: per-attempt deadlines, cooperative cancellation,
//!   panic isolation
//! - **Plugins**: external binaries speaking JSON over stdin/stdout
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reelsource::{MediaDescriptor, Providers, ResolveOptions};
//!
//! # async fn run(my_source: Arc<dyn reelsource::Source>) -> anyhow::Result<()> {
//! let providers = Providers::builder().source(my_source)?.build()?;
//! let media = MediaDescriptor::episode("Severance", 2022, "95396", 2, 5);
//! let options = ResolveOptions::default().on_progress(|event| eprintln!("{event:?}"));
//! let resolved = providers.resolve(&media, &options).await?;
//! for stream in &resolved.streams {
//!     println!("{} ({} captions)", stream.id(), stream.captions().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod captions;
pub mod config;
pub mod controls;
pub mod error;
pub mod fetch;
pub mod flags;
pub mod http_client;
pub mod media;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod stream;

pub use captions::{Caption, SubtitleFormat, SubtitleIndex, SubtitleKey};
pub use config::ResolverConfig;
pub use controls::{Providers, ProvidersBuilder};
pub use error::{
    AttemptFailure, EmbedError, EmbedFailure, FailureKind, ProviderError, RegistryError, ResolutionError,
};
pub use fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, Fetchers};
pub use flags::{select_transport, CapabilityFlag, FeatureSet, FlagSet, Target, Transport};
pub use http_client::{HttpFetcher, ProxiedFetcher};
pub use media::{MediaDescriptor, MediaKind};
pub use provider::{Embed, Provider, ProviderKind, ProviderMeta, RunContext, Source};
pub use registry::{Registry, RegistryBuilder};
pub use runner::{
    Pipeline, PipelineSettings, ResolveMode, ResolveOptions, ResolvedMedia, RunEvent, UpdateStatus,
};
pub use stream::{EmbedReference, EmbedResult, Quality, SourceResult, Stream};

/// Version of reelsource
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
