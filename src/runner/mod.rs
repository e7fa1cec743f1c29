//! Resolution runner: ranked source fallback with embed indirection.
//!
//! # Architecture
//!
//! - [`Pipeline`]: tries sources in rank order, routes embed references
//!   through the embed resolver, merges captions on success
//! - [`ResolveOptions`]: per-call mode, progress callback and cancellation
//! - [`PipelineSettings`]: per-process target, deadlines and subtitle index
//! - [`events`]: progress events and the attempt heartbeat

mod attempt;
pub mod embed;
pub mod events;
pub mod pipeline;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::captions::SubtitleIndex;
use crate::flags::{FeatureSet, Target};
use crate::stream::Stream;

pub use events::{DiscoveredEmbed, EventSink, Heartbeat, ProgressFn, ProgressReporter, RunEvent, UpdateStatus};
pub use pipeline::Pipeline;

/// How much of a successful source the pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveMode {
    /// Stop at the first stream-producing source or embed.
    #[default]
    FirstSuccess,
    /// Keep direct streams and resolve every embed of the winning source.
    CollectAll,
}

impl FromStr for ResolveMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first-success" | "first" => Ok(Self::FirstSuccess),
            "collect-all" | "all" => Ok(Self::CollectAll),
            other => Err(anyhow!("unknown resolve mode '{other}'")),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub mode: ResolveMode,
    pub events: EventSink,
    pub cancellation: CancellationToken,
}

impl ResolveOptions {
    #[must_use]
    pub fn mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn collect_all(self) -> Self {
        self.mode(ResolveMode::CollectAll)
    }

    /// Receive [`RunEvent`]s for this run.
    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(RunEvent) + Send + Sync + 'static) -> Self {
        self.events = EventSink::new(Arc::new(callback));
        self
    }

    /// Stop the run when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Default per-attempt deadline.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default time an in-flight attempt gets to unwind after cancellation.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Process-wide pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Where the resolved streams will be consumed.
    pub target: Target,
    /// Whether the consumer shares the resolving network.
    pub consistent_ip: bool,
    /// Deadline for providers that do not declare one.
    pub attempt_timeout: Duration,
    /// Unwind window after cancellation.
    pub cancel_grace: Duration,
    /// Tick interval for the attempt heartbeat; `None` disables it.
    pub heartbeat: Option<Duration>,
    /// Supplemental subtitle index; `None` disables the lookup.
    pub subtitles: Option<SubtitleIndex>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target: Target::Native,
            consistent_ip: true,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            heartbeat: None,
            subtitles: None,
        }
    }
}

impl PipelineSettings {
    /// Features every offered stream must satisfy.
    #[must_use]
    pub fn features(&self) -> FeatureSet {
        FeatureSet::for_target(self.target, self.consistent_ip)
    }
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    /// Usable streams, captions merged.
    pub streams: Vec<Stream>,
    /// Id of the source that produced the streams.
    pub origin_provider_id: String,
    /// Embed that produced the streams, when a single embed did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modes() {
        assert_eq!("collect-all".parse::<ResolveMode>().unwrap(), ResolveMode::CollectAll);
        assert_eq!("FIRST".parse::<ResolveMode>().unwrap(), ResolveMode::FirstSuccess);
        assert!("some".parse::<ResolveMode>().is_err());
    }

    #[test]
    fn default_settings_allow_everything() {
        let settings = PipelineSettings::default();
        assert!(settings.features().required.is_empty());
        assert!(settings.features().disallowed.is_empty());
    }
}
