//! Supplemental, provider-independent subtitle index.
//!
//! The index is queried by IMDb id plus season/episode and returns a JSON
//! array of `{url, language, format?}` objects. Responses are sometimes
//! truncated mid-array; [`repair_json`] trims back to the longest prefix
//! that parses. Nothing in here ever fails the caller: every error degrades
//! to an empty caption list.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{dedupe, Caption, SubtitleFormat};
use crate::fetch::{FetchRequest, Fetcher};
use crate::media::MediaDescriptor;

/// Default index endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://subs.whvx.net/search";

/// Tag set on captions supplied by the index.
pub const SOURCE_TAG: &str = "opensubtitles";

const CLIENT_HEADER: (&str, &str) = ("X-User-Agent", "VLSub 0.10.2");

/// Lookup key for the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleKey {
    pub imdb_id: String,
    pub season_episode: Option<(u32, u32)>,
}

impl SubtitleKey {
    /// Derive a key from a descriptor. Media without an IMDb id has no key;
    /// a zero season or episode is dropped, as in [`SubtitleKey::from_opaque`].
    #[must_use]
    pub fn from_media(media: &MediaDescriptor) -> Option<Self> {
        let imdb_id = media.imdb_id()?.trim();
        if imdb_id.is_empty() {
            return None;
        }
        Some(Self {
            imdb_id: imdb_id.to_string(),
            season_episode: media.season_episode().filter(|&(s, e)| s > 0 && e > 0),
        })
    }

    /// Opaque form: base64 of `imdb[.season.episode]`.
    #[must_use]
    pub fn to_opaque(&self) -> String {
        let raw = match self.season_episode {
            Some((s, e)) => format!("{}.{s}.{e}", self.imdb_id),
            None => self.imdb_id.clone(),
        };
        STANDARD.encode(raw)
    }

    /// Parse the opaque form. Season/episode are kept only when both are
    /// present and non-zero.
    #[must_use]
    pub fn from_opaque(opaque: &str) -> Option<Self> {
        let raw = String::from_utf8(STANDARD.decode(opaque.trim()).ok()?).ok()?;
        let mut parts = raw.split('.');
        let imdb_id = parts.next().filter(|id| !id.is_empty())?.to_string();
        let season = parts.next().and_then(|s| s.parse::<u32>().ok());
        let episode = parts.next().and_then(|e| e.parse::<u32>().ok());
        let season_episode = match (season, episode) {
            (Some(s), Some(e)) if s > 0 && e > 0 => Some((s, e)),
            _ => None,
        };
        Some(Self {
            imdb_id,
            season_episode,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    url: Option<String>,
    language: Option<String>,
    format: Option<String>,
}

/// Client for the subtitle index.
#[derive(Debug, Clone)]
pub struct SubtitleIndex {
    endpoint: String,
}

impl Default for SubtitleIndex {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl SubtitleIndex {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query the index. Returns de-duplicated captions, or an empty list on
    /// any failure.
    pub async fn lookup(&self, key: &SubtitleKey, fetcher: &dyn Fetcher) -> Vec<Caption> {
        let mut request = FetchRequest::get(&self.endpoint)
            .query("id", &key.imdb_id)
            .header(CLIENT_HEADER.0, CLIENT_HEADER.1);
        if let Some((season, episode)) = key.season_episode {
            request = request
                .query("season", season.to_string())
                .query("episode", episode.to_string());
        }

        let response = match fetcher.fetch(request).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                warn!(status = resp.status, imdb_id = %key.imdb_id, "subtitle index returned an error status");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, imdb_id = %key.imdb_id, "subtitle index request failed");
                return Vec::new();
            }
        };

        let captions = parse_index_body(&response.body);
        debug!(count = captions.len(), imdb_id = %key.imdb_id, "subtitle index lookup done");
        captions
    }
}

/// Parse an index response body into de-duplicated captions.
pub(crate) fn parse_index_body(body: &str) -> Vec<Caption> {
    let repaired = repair_json(body);
    let entries: Vec<IndexEntry> = match serde_json::from_str(&repaired) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "subtitle index payload is not a caption array");
            return Vec::new();
        }
    };

    let captions: Vec<Caption> = entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.url.filter(|u| !u.is_empty())?;
            let language = entry.language.filter(|l| !l.is_empty())?;
            let format = entry
                .format
                .as_deref()
                .and_then(SubtitleFormat::from_extension)
                .unwrap_or(SubtitleFormat::Srt);
            let mut caption = Caption::new(language, url, format);
            caption.source_tag = Some(SOURCE_TAG.to_string());
            Some(caption)
        })
        .collect();

    dedupe(&captions)
}

/// Trim a possibly-truncated JSON document back to the longest prefix ending
/// in `}` or `]` that parses, closing a dangling top-level array if needed.
/// Falls back to `"[]"`.
#[must_use]
pub fn repair_json(raw: &str) -> String {
    let raw = raw.trim();
    if is_json(raw) {
        return raw.to_string();
    }

    let is_array = raw.starts_with('[');
    let mut end = raw.len();
    while let Some(idx) = raw[..end].rfind(['}', ']']) {
        let candidate = &raw[..=idx];
        if is_json(candidate) {
            return candidate.to_string();
        }
        if is_array {
            let closed = format!("{candidate}]");
            if is_json(&closed) {
                return closed;
            }
        }
        end = idx;
    }

    "[]".to_string()
}

fn is_json(s: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(s).is_ok()
}
