//! Data types for search and stream resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of content a catalog request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "series" | "tv" | "show" => Ok(MediaKind::Series),
            other => Err(format!("Invalid media kind: {other}")),
        }
    }
}

/// One hit on a source's search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    /// Absolute URL of the content's detail page
    pub detail_url: String,
    pub poster_url: Option<String>,
    pub media_kind: MediaKind,
    pub source_name: String,
}

/// How a media reference is expected to play.
///
/// Derived from the URL or the element it was found on; a hint, not a
/// verified property of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaFormat {
    /// Progressive file such as `.mp4`
    DirectFile,
    /// HLS playlist (`.m3u8`)
    AdaptivePlaylist,
    /// A page embedding a player; needs another fetch to find media
    #[serde(rename = "embed-page")]
    Embed,
}

impl MediaFormat {
    /// Stable machine name.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaFormat::DirectFile => "direct-file",
            MediaFormat::AdaptivePlaylist => "adaptive-playlist",
            MediaFormat::Embed => "embed-page",
        }
    }

    /// Short label used in stream titles.
    pub fn label(self) -> &'static str {
        match self {
            MediaFormat::DirectFile => "MP4",
            MediaFormat::AdaptivePlaylist => "M3U8",
            MediaFormat::Embed => "EMBED",
        }
    }

    /// Check if the reference can be handed to a player as-is.
    pub fn is_playable(self) -> bool {
        !matches!(self, MediaFormat::Embed)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unverified media reference found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// Absolute URL
    pub url: String,
    pub format: MediaFormat,
    pub quality: String,
}

/// A playable stream offered to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub play_url: String,
    pub media_format: MediaFormat,
    /// Quality hint, `"Unknown"` when nothing was inferred
    pub quality_label: String,
    /// `"{source} - {MP4|M3U8}"`
    pub display_title: String,
    /// `"{source} - {quality}"`
    pub name: String,
    pub source_name: String,
}

impl ResolvedStream {
    /// Builds the stream offered for a playable candidate of `source_name`.
    pub fn from_candidate(source_name: &str, candidate: MediaCandidate) -> Self {
        Self {
            display_title: format!("{source_name} - {}", candidate.format.label()),
            name: format!("{source_name} - {}", candidate.quality),
            play_url: candidate.url,
            media_format: candidate.format,
            quality_label: candidate.quality,
            source_name: source_name.to_string(),
        }
    }
}

/// A search result together with the identifier it was stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(flatten)]
    pub result: SearchResult,
}
