//! Ranked fallback over sources.
//!
//! One [`Pipeline`] serves any number of concurrent runs: it only reads the
//! shared [`Registry`], and every run owns its failure log, contexts and
//! cancellation tokens.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::attempt::{self, Attempt, Bounds};
use super::embed::{resolve_embed, EmbedAttempt, EmbedOutcome, EmbedScope};
use super::events::{DiscoveredEmbed, ProgressReporter, RunEvent, UpdateStatus};
use super::{PipelineSettings, ResolveMode, ResolveOptions, ResolvedMedia};
use crate::captions::{self, SubtitleKey};
use crate::error::{AttemptFailure, EmbedFailure, FailureKind, ProviderError, ResolutionError, Result};
use crate::fetch::Fetchers;
use crate::flags::FeatureSet;
use crate::media::{MediaDescriptor, MediaKind};
use crate::provider::{Provider, ProviderKind, RunContext, Source};
use crate::registry::{ListOptions, Registry};
use crate::stream::{EmbedReference, Stream};

/// Streams produced by one source attempt, before captions are merged.
struct Found {
    streams: Vec<Stream>,
    origin: String,
    embed_id: Option<String>,
}

enum SourceAttempt {
    Resolved(Found),
    Failed(AttemptFailure),
    Cancelled,
}

/// The resolution engine.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: Arc<Registry>,
    fetchers: Fetchers,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(registry: Arc<Registry>, fetchers: Fetchers, settings: PipelineSettings) -> Self {
        Self {
            registry,
            fetchers,
            settings,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Sources eligible for `kind` under the configured target, in the
    /// order they will be tried.
    #[must_use]
    pub fn eligible_sources(&self, kind: MediaKind) -> Vec<Arc<dyn Source>> {
        let features = self.settings.features();
        self.registry
            .sources(ListOptions::default())
            .into_iter()
            .filter(|s| s.supports(kind) && features.allows(&s.meta().flags))
            .collect()
    }

    /// Resolve `media` into playable streams.
    ///
    /// Sources are attempted strictly one at a time in descending rank.
    /// Every failure is recorded and the next source is tried; only
    /// exhaustion, an empty source list or cancellation reach the caller.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::NoProvidersAvailable`] when no enabled source
    ///   supports this media under the configured target
    /// - [`ResolutionError::AllProvidersFailed`] with one entry per source
    ///   attempted, in attempt order
    /// - [`ResolutionError::Cancelled`] when `options.cancellation` fires
    #[instrument(skip(self, media, options), fields(media = %media, mode = ?options.mode))]
    pub async fn resolve(&self, media: &MediaDescriptor, options: &ResolveOptions) -> Result<ResolvedMedia> {
        let sources = self.eligible_sources(media.kind());
        if sources.is_empty() {
            return Err(ResolutionError::NoProvidersAvailable {
                kind: ProviderKind::Source,
            });
        }

        options.events.emit(RunEvent::Init {
            source_ids: sources.iter().map(|s| s.id().to_string()).collect(),
        });

        let media = Arc::new(media.clone());
        let features = self.settings.features();
        let mut failures = Vec::with_capacity(sources.len());

        for source in &sources {
            if options.cancellation.is_cancelled() {
                info!("resolution cancelled");
                return Err(ResolutionError::Cancelled);
            }
            match self.attempt_source(source.as_ref(), &media, options, &features).await {
                SourceAttempt::Resolved(found) => return self.finish(found, Some(&media), options).await,
                SourceAttempt::Failed(failure) => failures.push(failure),
                SourceAttempt::Cancelled => {
                    info!(source_id = %source.id(), "resolution cancelled mid-attempt");
                    return Err(ResolutionError::Cancelled);
                }
            }
        }

        warn!(attempted = failures.len(), "all sources failed");
        Err(ResolutionError::AllProvidersFailed { failures })
    }

    /// Run one source by id, embeds included, bypassing the ranked list.
    ///
    /// # Errors
    ///
    /// [`ResolutionError::UnknownProvider`] for missing or disabled ids,
    /// otherwise as [`Pipeline::resolve`] with a single-entry failure log.
    #[instrument(skip(self, media, options), fields(media = %media))]
    pub async fn run_source(
        &self,
        id: &str,
        media: &MediaDescriptor,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia> {
        let source = self
            .registry
            .source(id)
            .filter(|s| !s.meta().disabled)
            .ok_or_else(|| ResolutionError::UnknownProvider {
                kind: ProviderKind::Source,
                id: id.to_string(),
            })?;

        let media = Arc::new(media.clone());
        let features = self.settings.features();
        match self.attempt_source(source.as_ref(), &media, options, &features).await {
            SourceAttempt::Resolved(found) => self.finish(found, Some(&media), options).await,
            SourceAttempt::Failed(failure) => Err(ResolutionError::AllProvidersFailed {
                failures: vec![failure],
            }),
            SourceAttempt::Cancelled => Err(ResolutionError::Cancelled),
        }
    }

    /// Run one embed against `location`.
    ///
    /// `media`, when given, is exposed to the embed and used for the
    /// supplemental caption lookup.
    ///
    /// # Errors
    ///
    /// [`ResolutionError::UnknownProvider`] for missing or disabled ids,
    /// [`ResolutionError::AllProvidersFailed`] when the embed produces no
    /// usable stream, [`ResolutionError::Cancelled`] on cancellation.
    #[instrument(skip(self, media, options))]
    pub async fn run_embed(
        &self,
        id: &str,
        location: &str,
        media: Option<&MediaDescriptor>,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia> {
        if !self.registry.embed(id).is_some_and(|e| !e.meta().disabled) {
            return Err(ResolutionError::UnknownProvider {
                kind: ProviderKind::Embed,
                id: id.to_string(),
            });
        }

        let media = media.map(|m| Arc::new(m.clone()));
        let scope = EmbedScope {
            registry: &self.registry,
            fetchers: &self.fetchers,
            settings: &self.settings,
            media: media.clone(),
            cancellation: &options.cancellation,
        };
        let reference = EmbedReference::new(id, location);
        let features = self.settings.features();

        let failure = |kind: FailureKind, reason: String| ResolutionError::AllProvidersFailed {
            failures: vec![AttemptFailure {
                provider_id: id.to_string(),
                kind,
                reason,
                embeds: Vec::new(),
            }],
        };

        match resolve_embed(&scope, &reference, options.events.scoped(id)).await {
            EmbedAttempt::Cancelled => Err(ResolutionError::Cancelled),
            EmbedAttempt::Finished(Err(err)) => Err(failure(err.kind(), err.to_string())),
            EmbedAttempt::Finished(Ok(EmbedOutcome::Nothing { reason })) => Err(failure(FailureKind::NotFound, reason)),
            EmbedAttempt::Finished(Ok(EmbedOutcome::Streams(streams))) => {
                let streams: Vec<Stream> = streams.into_iter().filter(|s| s.is_usable(&features)).collect();
                if streams.is_empty() {
                    return Err(failure(FailureKind::NotFound, "no usable streams for this target".into()));
                }
                let found = Found {
                    streams,
                    origin: id.to_string(),
                    embed_id: Some(id.to_string()),
                };
                self.finish(found, media.as_ref(), options).await
            }
        }
    }

    async fn attempt_source(
        &self,
        source: &dyn Source,
        media: &Arc<MediaDescriptor>,
        options: &ResolveOptions,
        features: &FeatureSet,
    ) -> SourceAttempt {
        let meta = source.meta();
        let reporter = options.events.scoped(&meta.id);
        let token = options.cancellation.child_token();
        let ctx = RunContext::for_source(Arc::clone(media), self.fetchers.clone())
            .with_target(self.settings.target)
            .with_progress(reporter.clone())
            .with_cancellation(token.clone());

        reporter.start();
        debug!(source_id = %meta.id, rank = meta.rank, "attempting source");

        let call = async {
            match media.kind() {
                MediaKind::Movie => source.resolve_movie(&ctx).await,
                MediaKind::Episode => source.resolve_episode(&ctx).await,
            }
        };
        let bounds = Bounds {
            deadline: meta.timeout.unwrap_or(self.settings.attempt_timeout),
            grace: self.settings.cancel_grace,
            cancellation: &token,
            heartbeat: self.settings.heartbeat.map(|i| (reporter.clone(), i)),
        };

        let output = match attempt::run(call, bounds).await {
            Attempt::Cancelled => return SourceAttempt::Cancelled,
            Attempt::Done(Ok(output)) => output,
            Attempt::Done(Err(err)) => return SourceAttempt::Failed(source_failed(&meta.id, &reporter, &err)),
        };

        let offered = output.streams.len();
        let mut streams: Vec<Stream> = output
            .streams
            .into_iter()
            .map(|mut stream| {
                stream.inherit_flags(&meta.flags);
                stream
            })
            .filter(|stream| stream.is_usable(features))
            .collect();
        if streams.len() < offered {
            debug!(source_id = %meta.id, dropped = offered - streams.len(), "dropped unusable streams");
        }

        if !streams.is_empty() && options.mode == ResolveMode::FirstSuccess {
            reporter.finish(UpdateStatus::Success, None);
            return SourceAttempt::Resolved(Found {
                streams,
                origin: meta.id.clone(),
                embed_id: None,
            });
        }

        let direct = streams.len();
        let mut embed_failures = Vec::new();
        let mut contributors = Vec::new();

        if !output.embeds.is_empty() {
            let discovered: Vec<DiscoveredEmbed> = output
                .embeds
                .iter()
                .enumerate()
                .map(|(index, reference)| DiscoveredEmbed {
                    id: format!("{}-{index}", meta.id),
                    embed_id: reference.embed_id.clone(),
                })
                .collect();
            options.events.emit(RunEvent::DiscoverEmbeds {
                source_id: meta.id.clone(),
                embeds: discovered.clone(),
            });

            let scope = EmbedScope {
                registry: &self.registry,
                fetchers: &self.fetchers,
                settings: &self.settings,
                media: Some(Arc::clone(media)),
                cancellation: &options.cancellation,
            };

            for (reference, discovered) in output.embeds.iter().zip(discovered) {
                if options.cancellation.is_cancelled() {
                    return SourceAttempt::Cancelled;
                }
                let failed = |kind, reason| EmbedFailure {
                    embed_id: reference.embed_id.clone(),
                    kind,
                    reason,
                };
                match resolve_embed(&scope, reference, options.events.scoped(discovered.id)).await {
                    EmbedAttempt::Cancelled => return SourceAttempt::Cancelled,
                    EmbedAttempt::Finished(Ok(EmbedOutcome::Streams(found))) => {
                        let usable: Vec<Stream> = found.into_iter().filter(|s| s.is_usable(features)).collect();
                        if usable.is_empty() {
                            embed_failures.push(failed(
                                FailureKind::NotFound,
                                "no usable streams for this target".to_string(),
                            ));
                            continue;
                        }
                        contributors.push(reference.embed_id.clone());
                        streams.extend(usable);
                        if options.mode == ResolveMode::FirstSuccess {
                            break;
                        }
                    }
                    EmbedAttempt::Finished(Ok(EmbedOutcome::Nothing { reason })) => {
                        embed_failures.push(failed(FailureKind::NotFound, reason));
                    }
                    EmbedAttempt::Finished(Err(err)) => {
                        embed_failures.push(failed(err.kind(), err.to_string()));
                    }
                }
            }
        }

        if !streams.is_empty() {
            reporter.finish(UpdateStatus::Success, None);
            let embed_id = match contributors.as_slice() {
                [only] if direct == 0 => Some(only.clone()),
                _ => None,
            };
            return SourceAttempt::Resolved(Found {
                streams,
                origin: meta.id.clone(),
                embed_id,
            });
        }

        let (kind, reason) = if !embed_failures.is_empty() {
            (
                common_kind(&embed_failures),
                format!("none of {} embed(s) produced streams", embed_failures.len()),
            )
        } else if offered > 0 {
            (FailureKind::NotFound, format!("{offered} stream(s) unusable for this target"))
        } else {
            (FailureKind::NotFound, "no streams or embeds returned".to_string())
        };
        debug!(source_id = %meta.id, %kind, %reason, "source produced nothing");
        reporter.finish(UpdateStatus::NotFound, Some(reason.clone()));
        SourceAttempt::Failed(AttemptFailure {
            provider_id: meta.id.clone(),
            kind,
            reason,
            embeds: embed_failures,
        })
    }

    /// Merge supplemental captions into every stream and build the result.
    async fn finish(
        &self,
        found: Found,
        media: Option<&Arc<MediaDescriptor>>,
        options: &ResolveOptions,
    ) -> Result<ResolvedMedia> {
        let key = media.and_then(|m| SubtitleKey::from_media(m));
        let supplemental = match (&self.settings.subtitles, key) {
            (Some(index), Some(key)) => {
                let fetcher = Arc::clone(&self.fetchers.proxied);
                tokio::select! {
                    captions = index.lookup(&key, fetcher.as_ref()) => captions,
                    () = options.cancellation.cancelled() => return Err(ResolutionError::Cancelled),
                }
            }
            _ => Vec::new(),
        };

        let mut streams = found.streams;
        for stream in &mut streams {
            let merged = captions::merge(stream.captions(), &supplemental);
            *stream.captions_mut() = merged;
        }

        info!(
            origin = %found.origin,
            embed_id = ?found.embed_id,
            streams = streams.len(),
            "resolved"
        );
        Ok(ResolvedMedia {
            streams,
            origin_provider_id: found.origin,
            embed_id: found.embed_id,
        })
    }
}

fn source_failed(id: &str, reporter: &ProgressReporter, err: &ProviderError) -> AttemptFailure {
    let kind = err.kind();
    match kind {
        FailureKind::NotFound => debug!(source_id = %id, error = %err, "source found nothing"),
        _ => warn!(source_id = %id, %kind, error = %err, "source failed"),
    }
    let status = match kind {
        FailureKind::NotFound => UpdateStatus::NotFound,
        _ => UpdateStatus::Failure,
    };
    reporter.finish(status, Some(err.to_string()));
    AttemptFailure {
        provider_id: id.to_string(),
        kind,
        reason: err.to_string(),
        embeds: Vec::new(),
    }
}

/// The kind shared by every embed failure, or `NotFound` when they differ.
fn common_kind(failures: &[EmbedFailure]) -> FailureKind {
    match failures.split_first() {
        Some((first, rest)) if rest.iter().all(|f| f.kind == first.kind) => first.kind,
        _ => FailureKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed_failure(kind: FailureKind) -> EmbedFailure {
        EmbedFailure {
            embed_id: "e".into(),
            kind,
            reason: String::new(),
        }
    }

    #[test]
    fn common_kind_requires_agreement() {
        assert_eq!(
            common_kind(&[embed_failure(FailureKind::UnknownEmbed)]),
            FailureKind::UnknownEmbed
        );
        assert_eq!(
            common_kind(&[embed_failure(FailureKind::Fault), embed_failure(FailureKind::Timeout)]),
            FailureKind::NotFound
        );
    }
}
