//! Catalog data models
//!
//! Plain data types describing the media library: tracks and the albums
//! they belong to. Identifiers are opaque strings assigned by whatever
//! source the catalog was loaded from; the catalog never interprets them
//! beyond equality.

use serde::{Deserialize, Serialize};

// ============================================================================
// Track
// ============================================================================

/// A single playable track in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier within the catalog
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album title
    pub album: String,

    /// Identifier of the album this track belongs to, if known
    pub album_id: Option<String>,

    /// Duration in milliseconds
    pub duration_ms: u64,

    /// Locator for the underlying audio (path or URL)
    pub source: Option<String>,

    /// Position of the track within its album, if known
    pub track_number: Option<u32>,
}

impl Track {
    /// Create a new track with the required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            album_id: None,
            duration_ms: 0,
            source: None,
            track_number: None,
        }
    }

    /// Set the album identifier
    pub fn with_album_id(mut self, album_id: impl Into<String>) -> Self {
        self.album_id = Some(album_id.into());
        self
    }

    /// Set the duration in milliseconds
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the audio source locator
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the position of the track within its album
    pub fn with_track_number(mut self, track_number: u32) -> Self {
        self.track_number = Some(track_number);
        self
    }

    /// Validate track fields
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Album
// ============================================================================

/// An album grouping tracks in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    /// Unique identifier within the catalog
    pub id: String,

    /// Album title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Locator for the album artwork, if any
    pub artwork: Option<String>,
}

impl Album {
    /// Create a new album
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork: None,
        }
    }

    /// Set the artwork locator
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Validate album fields
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Album id cannot be empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Album title cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Normalize a string for case-insensitive matching
pub(crate) fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_builders() {
        let track = Track::new("t1", "Blue in Green", "Miles Davis", "Kind of Blue")
            .with_album_id("a1")
            .with_duration_ms(337_000)
            .with_source("file:///music/blue-in-green.flac")
            .with_track_number(3);

        assert_eq!(track.id, "t1");
        assert_eq!(track.album_id.as_deref(), Some("a1"));
        assert_eq!(track.duration_ms, 337_000);
        assert_eq!(track.track_number, Some(3));
        assert!(track.validate().is_ok());
    }

    #[test]
    fn test_track_validation() {
        let track = Track::new("t1", "", "Artist", "Album");
        assert!(track.validate().is_err());

        let track = Track::new("   ", "Title", "Artist", "Album");
        assert!(track.validate().is_err());
    }

    #[test]
    fn test_album_validation() {
        let album = Album::new("a1", "Kind of Blue", "Miles Davis");
        assert!(album.validate().is_ok());

        let album = Album::new("a1", "", "Miles Davis");
        assert!(album.validate().is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Kind Of BLUE "), "kind of blue");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_track_serialization() {
        let track = Track::new("t1", "So What", "Miles Davis", "Kind of Blue")
            .with_duration_ms(545_000);
        let json = serde_json::to_string(&track).unwrap();
        let parsed: Track = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, track);
    }
}
