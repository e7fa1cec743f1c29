//! Error taxonomy for provider resolution.
//!
//! Providers signal failure with [`ProviderError`]. The pipeline classifies
//! every failure into a [`FailureKind`], records it, and moves on; only
//! [`ResolutionError`] ever reaches the caller.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::provider::ProviderKind;

/// Failure signalled by a source or embed provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider reached its target but the media does not exist there.
    #[error("content not found: {reason}")]
    NotFound {
        /// Provider-supplied explanation.
        reason: String,
    },

    /// A network call inside the provider exceeded its deadline.
    #[error("timed out: {reason}")]
    Timeout {
        /// What timed out.
        reason: String,
    },

    /// Anything else: parse failures, unexpected response shapes, panics.
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl ProviderError {
    /// Shorthand for [`ProviderError::NotFound`].
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ProviderError::Timeout`].
    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::Timeout {
            reason: reason.into(),
        }
    }

    /// Attempt deadline exceeded at the pipeline level.
    pub(crate) fn deadline(after: Duration) -> Self {
        Self::timeout(format!("attempt exceeded {}ms", after.as_millis()))
    }

    /// Classification used in failure logs.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Fault(_) => FailureKind::Fault,
        }
    }
}

impl From<FetchError> for ProviderError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout { url } => Self::timeout(format!("request to {url}")),
            other => Self::Fault(other.into()),
        }
    }
}

/// Class of a recorded, non-fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Media not present at the provider.
    NotFound,
    /// Provider or attempt deadline exceeded.
    Timeout,
    /// Embed reference named an unregistered or disabled embed.
    UnknownEmbed,
    /// Unclassified provider failure.
    Fault,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::Timeout => "timeout",
            Self::UnknownEmbed => "unknown embed",
            Self::Fault => "fault",
        };
        f.write_str(label)
    }
}

/// Failure of a single embed reference.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// No enabled embed with this id is registered.
    #[error("unknown embed '{id}'")]
    UnknownEmbed {
        /// The id named by the reference.
        id: String,
    },

    /// The embed ran and failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl EmbedError {
    /// Classification used in failure logs.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnknownEmbed { .. } => FailureKind::UnknownEmbed,
            Self::Provider(err) => err.kind(),
        }
    }
}

/// Registration failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A provider of the same kind and id already exists.
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId {
        /// Source or embed.
        kind: ProviderKind,
        /// The clashing id.
        id: String,
    },
}

/// One entry of the diagnostic log carried by [`ResolutionError::AllProvidersFailed`].
#[derive(Debug, Clone, Serialize)]
pub struct AttemptFailure {
    /// Id of the source provider that was attempted.
    pub provider_id: String,
    /// How the attempt failed.
    pub kind: FailureKind,
    /// Human-readable reason, recorded verbatim.
    pub reason: String,
    /// Failures of individual embed references discovered by this source.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedFailure>,
}

/// Failure of one embed reference inside a source attempt.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedFailure {
    /// Embed id named by the reference.
    pub embed_id: String,
    /// How it failed.
    pub kind: FailureKind,
    /// Reason, recorded verbatim.
    pub reason: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.provider_id, self.kind, self.reason)
    }
}

/// Errors that escape a resolution run.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// No enabled provider of the requested kind is registered.
    #[error("no {kind} providers available")]
    NoProvidersAvailable {
        /// The kind that was requested.
        kind: ProviderKind,
    },

    /// A provider requested by id is not registered or is disabled.
    #[error("no enabled {kind} named '{id}'")]
    UnknownProvider {
        /// Source or embed.
        kind: ProviderKind,
        /// The requested id.
        id: String,
    },

    /// Every ranked provider was tried and none produced a stream.
    #[error("all {} provider(s) failed", failures.len())]
    AllProvidersFailed {
        /// Per-provider failures, in attempt order.
        failures: Vec<AttemptFailure>,
    },

    /// The run was cancelled before it completed.
    #[error("resolution cancelled")]
    Cancelled,
}

/// Convenience alias for results of a resolution run.
pub type Result<T> = std::result::Result<T, ResolutionError>;
