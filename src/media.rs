//! Media descriptors: the immutable input to a resolution run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Season reference for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRef {
    /// Season number.
    pub number: u32,
}

/// Episode reference within a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    /// Episode number within the season.
    pub number: u32,
    /// TMDB id of the episode itself, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
}

/// The piece of media a caller wants streams for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaDescriptor {
    /// A feature film.
    #[serde(rename_all = "camelCase")]
    Movie {
        /// Display title.
        title: String,
        /// Year of release.
        release_year: u16,
        /// TMDB id.
        tmdb_id: String,
        /// IMDb id (`tt...`), when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imdb_id: Option<String>,
    },
    /// A single episode of a show.
    #[serde(rename_all = "camelCase")]
    Episode {
        /// Show title.
        title: String,
        /// Year the show was first released.
        release_year: u16,
        /// TMDB id of the show.
        tmdb_id: String,
        /// IMDb id of the show, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imdb_id: Option<String>,
        /// Season reference.
        season: SeasonRef,
        /// Episode reference.
        episode: EpisodeRef,
    },
}

/// Which resolve operation a source is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// [`MediaDescriptor::Movie`].
    Movie,
    /// [`MediaDescriptor::Episode`].
    Episode,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => f.write_str("movie"),
            Self::Episode => f.write_str("episode"),
        }
    }
}

impl MediaDescriptor {
    /// Build a movie descriptor.
    pub fn movie(title: impl Into<String>, release_year: u16, tmdb_id: impl Into<String>) -> Self {
        Self::Movie {
            title: title.into(),
            release_year,
            tmdb_id: tmdb_id.into(),
            imdb_id: None,
        }
    }

    /// Build an episode descriptor.
    pub fn episode(
        title: impl Into<String>,
        release_year: u16,
        tmdb_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Self {
        Self::Episode {
            title: title.into(),
            release_year,
            tmdb_id: tmdb_id.into(),
            imdb_id: None,
            season: SeasonRef { number: season },
            episode: EpisodeRef {
                number: episode,
                tmdb_id: None,
            },
        }
    }

    /// Attach an IMDb id.
    #[must_use]
    pub fn with_imdb_id(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Self::Movie { imdb_id, .. } | Self::Episode { imdb_id, .. } => {
                *imdb_id = Some(id.into());
            }
        }
        self
    }

    /// Movie or episode.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Movie { .. } => MediaKind::Movie,
            Self::Episode { .. } => MediaKind::Episode,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Movie { title, .. } | Self::Episode { title, .. } => title,
        }
    }

    #[must_use]
    pub fn release_year(&self) -> u16 {
        match self {
            Self::Movie { release_year, .. } | Self::Episode { release_year, .. } => *release_year,
        }
    }

    #[must_use]
    pub fn tmdb_id(&self) -> &str {
        match self {
            Self::Movie { tmdb_id, .. } | Self::Episode { tmdb_id, .. } => tmdb_id,
        }
    }

    #[must_use]
    pub fn imdb_id(&self) -> Option<&str> {
        match self {
            Self::Movie { imdb_id, .. } | Self::Episode { imdb_id, .. } => imdb_id.as_deref(),
        }
    }

    /// `(season, episode)` numbers for an episode, `None` for a movie.
    #[must_use]
    pub fn season_episode(&self) -> Option<(u32, u32)> {
        match self {
            Self::Movie { .. } => None,
            Self::Episode {
                season, episode, ..
            } => Some((season.number, episode.number)),
        }
    }
}

impl fmt::Display for MediaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.season_episode() {
            None => write!(f, "{} ({})", self.title(), self.release_year()),
            Some((s, e)) => write!(f, "{} ({}) S{s:02}E{e:02}", self.title(), self.release_year()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_accessors() {
        let media = MediaDescriptor::episode("Show", 2010, "1399", 2, 5).with_imdb_id("tt0944947");
        assert_eq!(media.kind(), MediaKind::Episode);
        assert_eq!(media.season_episode(), Some((2, 5)));
        assert_eq!(media.imdb_id(), Some("tt0944947"));
        assert_eq!(media.to_string(), "Show (2010) S02E05");
    }

    #[test]
    fn movie_serializes_with_type_tag() {
        let media = MediaDescriptor::movie("Film", 1999, "603");
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "movie");
        assert_eq!(json["releaseYear"], 1999);
        assert_eq!(json["tmdbId"], "603");
        assert!(json.get("imdbId").is_none());
    }

    #[test]
    fn episode_parses_from_json() {
        let json = r#"{
            "type": "episode", "title": "Show", "releaseYear": 2010, "tmdbId": "1",
            "season": {"number": 1}, "episode": {"number": 3, "tmdbId": "99"}
        }"#;
        let media: MediaDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(media.season_episode(), Some((1, 3)));
        assert!(media.imdb_id().is_none());
    }
}
