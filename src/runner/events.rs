//! Progress events emitted during a run.
//!
//! Events flow through an optional caller callback. Nothing here holds
//! global state: each attempt gets its own [`ProgressReporter`], and the
//! optional [`Heartbeat`] is aborted when its guard drops.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

/// Outcome attached to an [`RunEvent::Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Pending,
    Success,
    NotFound,
    Failure,
}

/// An embed reference surfaced by a source, with a run-unique id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredEmbed {
    /// `"{source_id}-{index}"`.
    pub id: String,
    pub embed_id: String,
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The ranked list of sources about to be tried.
    Init { source_ids: Vec<String> },
    /// An attempt (source or embed) started.
    Start { id: String },
    /// Progress or outcome of an attempt.
    Update {
        id: String,
        percent: u8,
        status: UpdateStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A source returned embed references.
    DiscoverEmbeds {
        source_id: String,
        embeds: Vec<DiscoveredEmbed>,
    },
}

/// Caller-supplied event callback.
pub type ProgressFn = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Optional event callback; a no-op when unset.
#[derive(Clone, Default)]
pub struct EventSink(Option<ProgressFn>);

impl EventSink {
    pub fn new(callback: ProgressFn) -> Self {
        Self(Some(callback))
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(callback) = &self.0 {
            callback(event);
        }
    }

    /// Reporter scoped to one attempt.
    #[must_use]
    pub fn scoped(&self, id: impl Into<String>) -> ProgressReporter {
        ProgressReporter {
            sink: self.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventSink")
            .field(&self.0.as_ref().map(|_| "callback"))
            .finish()
    }
}

/// Progress channel for a single attempt.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sink: EventSink,
    id: String,
}

impl ProgressReporter {
    /// Id of the attempt this reporter belongs to.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Report pending progress, clamped to 100.
    pub fn report(&self, percent: u8) {
        self.update(percent.min(100), UpdateStatus::Pending, None);
    }

    pub(crate) fn start(&self) {
        self.sink.emit(RunEvent::Start {
            id: self.id.clone(),
        });
    }

    pub(crate) fn finish(&self, status: UpdateStatus, reason: Option<String>) {
        self.update(100, status, reason);
    }

    fn update(&self, percent: u8, status: UpdateStatus, reason: Option<String>) {
        self.sink.emit(RunEvent::Update {
            id: self.id.clone(),
            percent,
            status,
            reason,
        });
    }
}

/// Highest percentage a heartbeat reports on its own.
const HEARTBEAT_CEILING: u8 = 90;

/// Background task ticking pending progress while an attempt runs.
///
/// The task is aborted when the guard is dropped, so it never outlives the
/// attempt that owns it.
#[derive(Debug)]
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn a heartbeat on the current tokio runtime.
    #[must_use]
    pub fn start(reporter: ProgressReporter, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            for percent in 1..=HEARTBEAT_CEILING {
                ticker.tick().await;
                reporter.report(percent);
            }
        });
        Self { handle }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
