//! Stream model shared by sources, embeds and the pipeline.
//!
//! A provider returns either ready [`Stream`]s or [`EmbedReference`]s that
//! point at an embed provider. Streams come in two shapes: progressive files
//! keyed by quality, and HLS playlists.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::captions::Caption;
use crate::flags::{FeatureSet, FlagSet};

/// Quality label for a progressive file.
///
/// Deserialization goes through [`Quality::from_label`], so `"1080p"`,
/// `"1080"` and `"2160p"` are all accepted and unrecognized labels become
/// [`Quality::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Quality {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "360")]
    P360,
    #[serde(rename = "480")]
    P480,
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
    #[serde(rename = "4k")]
    P4k,
}

impl Quality {
    /// Parse labels like `"1080p"`, `"720"`, `"2160p"`, `"4K"`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        match label.trim_end_matches('p') {
            "360" => Self::P360,
            "480" => Self::P480,
            "720" => Self::P720,
            "1080" => Self::P1080,
            "4k" | "2160" => Self::P4k,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::P4k => "4k",
        };
        f.write_str(label)
    }
}

/// Container of a progressive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Webm,
    Mkv,
}

/// One downloadable file at a given quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFile {
    #[serde(rename = "type", default)]
    pub container: Container,
    pub url: String,
}

/// Progressive download stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStream {
    pub id: String,
    pub qualities: BTreeMap<Quality, StreamFile>,
    #[serde(default)]
    pub captions: Vec<Caption>,
    /// `None` means "not stated"; the producing provider's flags apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<FlagSet>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

/// HLS playlist stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsStream {
    pub id: String,
    pub playlist: String,
    #[serde(default)]
    pub captions: Vec<Caption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<FlagSet>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

/// A playable stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stream {
    File(FileStream),
    Hls(HlsStream),
}

impl Stream {
    /// HLS stream with no captions and unstated flags.
    pub fn hls(id: impl Into<String>, playlist: impl Into<String>) -> Self {
        Self::Hls(HlsStream {
            id: id.into(),
            playlist: playlist.into(),
            captions: Vec::new(),
            flags: None,
            disabled: false,
        })
    }

    /// File stream with a single quality.
    pub fn file(id: impl Into<String>, quality: Quality, url: impl Into<String>) -> Self {
        let mut qualities = BTreeMap::new();
        qualities.insert(
            quality,
            StreamFile {
                container: Container::Mp4,
                url: url.into(),
            },
        );
        Self::File(FileStream {
            id: id.into(),
            qualities,
            captions: Vec::new(),
            flags: None,
            disabled: false,
        })
    }

    /// Set explicit flags.
    #[must_use]
    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        *self.flags_slot() = Some(flags);
        self
    }

    /// Replace the caption list.
    #[must_use]
    pub fn with_captions(mut self, captions: Vec<Caption>) -> Self {
        *self.captions_mut() = captions;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::File(s) => &s.id,
            Self::Hls(s) => &s.id,
        }
    }

    #[must_use]
    pub fn captions(&self) -> &[Caption] {
        match self {
            Self::File(s) => &s.captions,
            Self::Hls(s) => &s.captions,
        }
    }

    pub fn captions_mut(&mut self) -> &mut Vec<Caption> {
        match self {
            Self::File(s) => &mut s.captions,
            Self::Hls(s) => &mut s.captions,
        }
    }

    /// Explicitly stated flags, if any.
    #[must_use]
    pub fn flags(&self) -> Option<&FlagSet> {
        match self {
            Self::File(s) => s.flags.as_ref(),
            Self::Hls(s) => s.flags.as_ref(),
        }
    }

    fn flags_slot(&mut self) -> &mut Option<FlagSet> {
        match self {
            Self::File(s) => &mut s.flags,
            Self::Hls(s) => &mut s.flags,
        }
    }

    /// Apply `defaults` when the stream did not state flags itself.
    pub fn inherit_flags(&mut self, defaults: &FlagSet) {
        let slot = self.flags_slot();
        if slot.is_none() {
            *slot = Some(defaults.clone());
        }
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        match self {
            Self::File(s) => s.disabled,
            Self::Hls(s) => s.disabled,
        }
    }

    /// Shape check: a file stream needs at least one quality and no empty
    /// URLs; a playlist needs a non-empty URL.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        match self {
            Self::File(s) => {
                !s.qualities.is_empty() && s.qualities.values().all(|f| !f.url.trim().is_empty())
            }
            Self::Hls(s) => !s.playlist.trim().is_empty(),
        }
    }

    /// Whether the stream may be offered under `features`.
    #[must_use]
    pub fn is_usable(&self, features: &FeatureSet) -> bool {
        let empty = FlagSet::new();
        !self.is_disabled()
            && self.is_structurally_valid()
            && features.allows(self.flags().unwrap_or(&empty))
    }
}

/// Pointer from a source to an embed provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedReference {
    /// Id of the embed provider that understands `location`.
    pub embed_id: String,
    /// Opaque payload passed verbatim to the embed, usually a URL.
    #[serde(alias = "url")]
    pub location: String,
}

impl EmbedReference {
    pub fn new(embed_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            embed_id: embed_id.into(),
            location: location.into(),
        }
    }
}

/// Output of a source provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    #[serde(default, alias = "stream")]
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub embeds: Vec<EmbedReference>,
}

impl SourceResult {
    /// Result carrying only streams.
    #[must_use]
    pub fn streams(streams: Vec<Stream>) -> Self {
        Self {
            streams,
            embeds: Vec::new(),
        }
    }

    /// Result carrying only embed references.
    #[must_use]
    pub fn embeds(embeds: Vec<EmbedReference>) -> Self {
        Self {
            streams: Vec::new(),
            embeds,
        }
    }

    /// Neither streams nor embeds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.embeds.is_empty()
    }
}

/// Output of an embed provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedResult {
    #[serde(default, alias = "stream")]
    pub streams: Vec<Stream>,
}
