//! Embed resolution: one [`EmbedReference`] in, streams out.
//!
//! References are resolved independently; which reference to try next is the
//! pipeline's decision.

use std::sync::Arc;

use tracing::{debug, warn};

use super::attempt::{self, Attempt, Bounds};
use super::events::{ProgressReporter, UpdateStatus};
use super::PipelineSettings;
use crate::error::{EmbedError, ProviderError};
use crate::fetch::Fetchers;
use crate::media::MediaDescriptor;
use crate::provider::{Provider, RunContext};
use crate::registry::Registry;
use crate::stream::{EmbedReference, Stream};

/// Result of resolving one reference that did not fail outright.
#[derive(Debug)]
pub enum EmbedOutcome {
    /// The embed produced streams (flags already inherited).
    Streams(Vec<Stream>),
    /// The embed found nothing at the location.
    Nothing {
        /// Why nothing was produced.
        reason: String,
    },
}

/// Shared inputs for embed sub-resolutions within one run.
pub(crate) struct EmbedScope<'a> {
    pub registry: &'a Registry,
    pub fetchers: &'a Fetchers,
    pub settings: &'a PipelineSettings,
    pub media: Option<Arc<MediaDescriptor>>,
    pub cancellation: &'a tokio_util::sync::CancellationToken,
}

/// Either a finished embed attempt or a cancelled run.
pub(crate) enum EmbedAttempt {
    Finished(Result<EmbedOutcome, EmbedError>),
    Cancelled,
}

/// Resolve a single embed reference.
///
/// Unknown or disabled embed ids fail with [`EmbedError::UnknownEmbed`]
/// without running anything. "Not found" from the embed becomes
/// [`EmbedOutcome::Nothing`]; every other provider failure propagates.
pub(crate) async fn resolve_embed(
    scope: &EmbedScope<'_>,
    reference: &EmbedReference,
    reporter: ProgressReporter,
) -> EmbedAttempt {
    let embed = match scope.registry.embed(&reference.embed_id) {
        Some(embed) if !embed.meta().disabled => embed,
        _ => {
            warn!(embed_id = %reference.embed_id, "skipping reference to unknown or disabled embed");
            let err = EmbedError::UnknownEmbed {
                id: reference.embed_id.clone(),
            };
            reporter.finish(UpdateStatus::Failure, Some(err.to_string()));
            return EmbedAttempt::Finished(Err(err));
        }
    };

    let token = scope.cancellation.child_token();
    let ctx = RunContext::for_embed(reference.location.clone(), scope.fetchers.clone())
        .with_media(scope.media.clone())
        .with_target(scope.settings.target)
        .with_progress(reporter.clone())
        .with_cancellation(token.clone());

    reporter.start();
    let bounds = Bounds {
        deadline: embed.meta().timeout.unwrap_or(scope.settings.attempt_timeout),
        grace: scope.settings.cancel_grace,
        cancellation: &token,
        heartbeat: scope.settings.heartbeat.map(|i| (reporter.clone(), i)),
    };

    let result = match attempt::run(embed.resolve(&ctx), bounds).await {
        Attempt::Cancelled => return EmbedAttempt::Cancelled,
        Attempt::Done(result) => result,
    };

    let outcome = match result {
        Ok(output) if output.streams.is_empty() => {
            reporter.finish(UpdateStatus::NotFound, Some("no streams".into()));
            Ok(EmbedOutcome::Nothing {
                reason: "embed returned no streams".into(),
            })
        }
        Ok(output) => {
            let mut streams = output.streams;
            for stream in &mut streams {
                stream.inherit_flags(&embed.meta().flags);
            }
            debug!(embed_id = %embed.id(), count = streams.len(), "embed produced streams");
            reporter.finish(UpdateStatus::Success, None);
            Ok(EmbedOutcome::Streams(streams))
        }
        Err(ProviderError::NotFound { reason }) => {
            debug!(embed_id = %embed.id(), %reason, "embed found nothing");
            reporter.finish(UpdateStatus::NotFound, Some(reason.clone()));
            Ok(EmbedOutcome::Nothing { reason })
        }
        Err(err) => {
            warn!(embed_id = %embed.id(), error = %err, "embed failed");
            reporter.finish(UpdateStatus::Failure, Some(err.to_string()));
            Err(EmbedError::Provider(err))
        }
    };
    EmbedAttempt::Finished(outcome)
}
