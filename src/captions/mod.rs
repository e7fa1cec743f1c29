//! Caption tracks and language de-duplication.
//!
//! Captions arrive from two places: the embed/source that produced a stream,
//! and an optional provider-independent subtitle index
//! ([`opensubtitles`]). [`merge`] folds both into one list with at most one
//! track per language.

pub mod language;
pub mod opensubtitles;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use language::normalize_language;
pub use opensubtitles::{SubtitleIndex, SubtitleKey};

/// Subtitle file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// `SubRip` (.srt)
    #[default]
    Srt,
    /// `WebVTT` (.vtt)
    Vtt,
}

impl SubtitleFormat {
    /// Detect the format from a URL's file extension, ignoring query strings.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path.rsplit('.').next()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    /// Parse `"srt"` / `"vtt"`.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single subtitle track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    /// Provider-stable id, usually the track URL.
    pub id: String,
    /// Language label; normalized to ISO 639-1 once merged.
    pub language: String,
    /// Track URL.
    pub url: String,
    /// File format.
    #[serde(rename = "type", default)]
    pub format: SubtitleFormat,
    /// Whether the URL can only be fetched through the proxy.
    #[serde(default)]
    pub has_cors_restrictions: bool,
    /// Origin tag, e.g. `"opensubtitles"` for index-supplied tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tag: Option<String>,
}

impl Caption {
    /// Build a caption whose id is its URL.
    pub fn new(language: impl Into<String>, url: impl Into<String>, format: SubtitleFormat) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            language: language.into(),
            url,
            format,
            has_cors_restrictions: false,
            source_tag: None,
        }
    }
}

/// Merge two caption lists, keeping the first track seen per language.
///
/// `primary` is scanned before `supplemental`. Languages are normalized on
/// the way through; tracks whose language cannot be normalized are dropped.
/// Output order is order of first appearance. The operation is idempotent:
/// `merge(&merge(a, &[]), b) == merge(a, b)`.
#[must_use]
pub fn merge(primary: &[Caption], supplemental: &[Caption]) -> Vec<Caption> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(primary.len() + supplemental.len());

    for caption in primary.iter().chain(supplemental) {
        let Some(code) = normalize_language(&caption.language) else {
            continue;
        };
        if seen.insert(code) {
            let mut caption = caption.clone();
            caption.language = code.to_string();
            merged.push(caption);
        }
    }

    merged
}

/// De-duplicate a single provider's own tracks.
#[must_use]
pub fn dedupe(captions: &[Caption]) -> Vec<Caption> {
    merge(captions, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(lang: &str, url: &str) -> Caption {
        Caption::new(lang, url, SubtitleFormat::Vtt)
    }

    #[test]
    fn format_from_url() {
        assert_eq!(SubtitleFormat::from_url("https://x/a.srt"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_url("https://x/a.VTT?t=1"), Some(SubtitleFormat::Vtt));
        assert_eq!(SubtitleFormat::from_url("https://x/a.ass"), None);
    }

    #[test]
    fn first_seen_language_wins() {
        let primary = vec![cap("English", "p1"), cap("en", "p2"), cap("fr", "p3")];
        let supplemental = vec![cap("eng", "s1"), cap("de", "s2")];
        let merged = merge(&primary, &supplemental);
        let urls: Vec<_> = merged.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, ["p1", "p3", "s2"]);
        let langs: Vec<_> = merged.iter().map(|c| c.language.as_str()).collect();
        assert_eq!(langs, ["en", "fr", "de"]);
    }

    #[test]
    fn unnormalizable_languages_are_dropped() {
        let merged = merge(&[cap("und", "a"), cap("", "b"), cap("it", "c")], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].language, "it");
    }

    #[test]
    fn provider_dedupe_collapses_repeats() {
        let own = vec![cap("English", "1"), cap("English (forced)", "2"), cap("en-GB", "3")];
        let deduped = dedupe(&own);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].url, "1");
    }

    #[test]
    fn dedupe_is_safe_to_apply_twice() {
        let a = vec![cap("en", "a1"), cap("English", "a2"), cap("es", "a3")];
        let b = vec![cap("es", "b1"), cap("ja", "b2")];
        assert_eq!(merge(&dedupe(&a), &b), merge(&a, &b));
        assert_eq!(dedupe(&dedupe(&a)), dedupe(&a));
    }

    #[test]
    fn merge_is_associative_for_disjoint_sets() {
        let a = vec![cap("en", "a")];
        let b = vec![cap("fr", "b")];
        let c = vec![cap("de", "c")];
        assert_eq!(merge(&merge(&a, &b), &c), merge(&a, &merge(&b, &c)));
    }

    #[test]
    fn merging_with_itself_is_identity() {
        let set = dedupe(&[cap("en", "1"), cap("pt", "2"), cap("ko", "3")]);
        assert_eq!(merge(&set, &set), set);
    }

    #[test]
    fn caption_json_uses_type_field() {
        let json = r#"{"id":"u","language":"en","url":"u","type":"vtt","hasCorsRestrictions":true}"#;
        let caption: Caption = serde_json::from_str(json).unwrap();
        assert_eq!(caption.format, SubtitleFormat::Vtt);
        assert!(caption.has_cors_restrictions);
        assert!(caption.source_tag.is_none());
    }
}
