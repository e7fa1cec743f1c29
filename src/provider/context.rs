//! Per-attempt context handed to providers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::fetch::{Fetcher, Fetchers};
use crate::flags::{FlagSet, Target};
use crate::media::MediaDescriptor;
use crate::runner::events::ProgressReporter;

/// Everything a provider may use during one attempt.
///
/// A context is built fresh for every source attempt and every embed
/// sub-resolution; it is never shared between attempts.
#[derive(Debug, Clone)]
pub struct RunContext {
    media: Option<Arc<MediaDescriptor>>,
    location: Option<String>,
    fetchers: Fetchers,
    target: Target,
    progress: ProgressReporter,
    cancellation: CancellationToken,
}

impl RunContext {
    /// Context for a source attempt.
    pub fn for_source(media: Arc<MediaDescriptor>, fetchers: Fetchers) -> Self {
        Self {
            media: Some(media),
            location: None,
            fetchers,
            target: Target::default(),
            progress: ProgressReporter::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Context for an embed attempt targeting `location`.
    pub fn for_embed(location: impl Into<String>, fetchers: Fetchers) -> Self {
        Self {
            media: None,
            location: Some(location.into()),
            fetchers,
            target: Target::default(),
            progress: ProgressReporter::default(),
            cancellation: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: Option<Arc<MediaDescriptor>>) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The media being resolved. Always set for source attempts; set for
    /// embed attempts spawned by the pipeline.
    #[must_use]
    pub fn media(&self) -> Option<&MediaDescriptor> {
        self.media.as_deref()
    }

    /// The embed location. Set for embed attempts only.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// Direct transport.
    #[must_use]
    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetchers.direct.as_ref()
    }

    /// Proxied transport.
    #[must_use]
    pub fn proxied_fetcher(&self) -> &dyn Fetcher {
        self.fetchers.proxied.as_ref()
    }

    /// Transport suited to an endpoint carrying `flags` under this
    /// context's target.
    #[must_use]
    pub fn fetcher_for(&self, flags: &FlagSet) -> Arc<dyn Fetcher> {
        self.fetchers.select(flags, self.target)
    }

    /// Advisory progress for this attempt, `0..=100`.
    pub fn progress(&self, percent: u8) {
        self.progress.report(percent);
    }

    /// Fires when the run is cancelled. Long-running providers should
    /// select on it around their own I/O.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
