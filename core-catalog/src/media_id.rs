//! Hierarchical media identifiers
//!
//! A media id names either a browsable category ("everything", "one album",
//! "one artist", "one search result set") or a single track inside such a
//! category. The string form is compact and round-trips through [`parse`]:
//!
//! ```text
//! ALL                  all tracks
//! ALBUM/7              tracks of album 7
//! ARTIST/Miles Davis   tracks by an artist
//! SEARCH/so what       tracks matching a search
//! ALL|t42              track t42, reached through the full catalog
//! QUEUE|t42            track t42, added to the queue directly
//! ```
//!
//! The part before `|` records where the track came from, so a queue built
//! from it can be rebuilt later from the category alone.
//!
//! [`parse`]: MediaId::parse

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CatalogError, Result};

/// Separator between a category name and its value
const CATEGORY_SEPARATOR: char = '/';
/// Separator between the category part and the track id
const TRACK_SEPARATOR: char = '|';

const CATEGORY_ALL: &str = "ALL";
const CATEGORY_ALBUM: &str = "ALBUM";
const CATEGORY_ARTIST: &str = "ARTIST";
const CATEGORY_SEARCH: &str = "SEARCH";
const CATEGORY_QUEUE: &str = "QUEUE";

// ============================================================================
// CategoryPath
// ============================================================================

/// A browsable slice of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryPath {
    /// The whole catalog, in catalog order
    AllTracks,
    /// All tracks of one album, by album id
    ByAlbum(String),
    /// All tracks of one artist, by exact artist name
    ByArtist(String),
    /// All tracks matching a free-text search
    BySearch(String),
    /// No category; the track was queued directly
    Queue,
}

impl CategoryPath {
    /// The category keyword used in the string form
    pub fn kind_str(&self) -> &'static str {
        match self {
            CategoryPath::AllTracks => CATEGORY_ALL,
            CategoryPath::ByAlbum(_) => CATEGORY_ALBUM,
            CategoryPath::ByArtist(_) => CATEGORY_ARTIST,
            CategoryPath::BySearch(_) => CATEGORY_SEARCH,
            CategoryPath::Queue => CATEGORY_QUEUE,
        }
    }

    /// The value part of the category, if it carries one
    pub fn value(&self) -> Option<&str> {
        match self {
            CategoryPath::AllTracks | CategoryPath::Queue => None,
            CategoryPath::ByAlbum(v) | CategoryPath::ByArtist(v) | CategoryPath::BySearch(v) => {
                Some(v)
            }
        }
    }

    /// Human-readable label, used as a default queue title
    pub fn label(&self) -> String {
        match self {
            CategoryPath::AllTracks => "All tracks".to_string(),
            CategoryPath::ByAlbum(v) => format!("Album: {}", v),
            CategoryPath::ByArtist(v) => format!("Artist: {}", v),
            CategoryPath::BySearch(v) => format!("Search: {}", v),
            CategoryPath::Queue => "Queue".to_string(),
        }
    }

    fn parse(s: &str) -> Result<Self> {
        let (kind, value) = match s.split_once(CATEGORY_SEPARATOR) {
            Some((kind, value)) => (kind, Some(value)),
            None => (s, None),
        };
        match (kind, value) {
            (CATEGORY_ALL, None) => Ok(CategoryPath::AllTracks),
            (CATEGORY_QUEUE, None) => Ok(CategoryPath::Queue),
            (CATEGORY_ALBUM, Some(v)) if !v.is_empty() => Ok(CategoryPath::ByAlbum(v.to_string())),
            (CATEGORY_ARTIST, Some(v)) if !v.is_empty() => {
                Ok(CategoryPath::ByArtist(v.to_string()))
            }
            (CATEGORY_SEARCH, Some(v)) if !v.is_empty() => {
                Ok(CategoryPath::BySearch(v.to_string()))
            }
            _ => Err(CatalogError::InvalidMediaId(s.to_string())),
        }
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{}{}{}", self.kind_str(), CATEGORY_SEPARATOR, v),
            None => write!(f, "{}", self.kind_str()),
        }
    }
}

// ============================================================================
// MediaId
// ============================================================================

/// A full media identifier: a category, optionally narrowed to one track
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId {
    /// The browsable category this id belongs to
    pub category: CategoryPath,
    /// The track inside the category, if the id names a single track
    pub track_id: Option<String>,
}

impl MediaId {
    /// An id naming a whole category
    pub fn browse(category: CategoryPath) -> Self {
        Self { category, track_id: None }
    }

    /// An id naming one track inside a category
    pub fn track(category: CategoryPath, track_id: impl Into<String>) -> Self {
        Self { category, track_id: Some(track_id.into()) }
    }

    /// An id for a track queued directly, outside any browsable category
    pub fn queued_track(track_id: impl Into<String>) -> Self {
        Self::track(CategoryPath::Queue, track_id)
    }

    /// Parse the string form back into a media id
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidMediaId`] when the category keyword is
    /// unknown, a valued category is missing its value, or the track part is
    /// empty or contains a separator.
    pub fn parse(s: &str) -> Result<Self> {
        let (category_part, track_part) = match s.split_once(TRACK_SEPARATOR) {
            Some((category, track)) => (category, Some(track)),
            None => (s, None),
        };
        if let Some(track) = track_part {
            if track.is_empty() || track.contains(TRACK_SEPARATOR) {
                return Err(CatalogError::InvalidMediaId(s.to_string()));
            }
        }
        // Make the full input visible in errors, not just the category part.
        let category = CategoryPath::parse(category_part)
            .map_err(|_| CatalogError::InvalidMediaId(s.to_string()))?;
        Ok(Self { category, track_id: track_part.map(str::to_string) })
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.track_id {
            Some(id) => write!(f, "{}{}{}", self.category, TRACK_SEPARATOR, id),
            None => write!(f, "{}", self.category),
        }
    }
}

impl FromStr for MediaId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for MediaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MediaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
