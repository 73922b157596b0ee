//! Catalog source abstraction
//!
//! A [`CatalogSource`] is where the catalog gets its data from: a local
//! file scan, a remote index, a bundled fixture. The provider treats the
//! source as a single fallible load; retry policy lives with the caller.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Album, Track};

/// Everything a source hands over in one load
#[derive(Debug, Clone, Default)]
pub struct CatalogData {
    /// Albums, in source order
    pub albums: Vec<Album>,
    /// Tracks, in source order
    pub tracks: Vec<Track>,
}

impl CatalogData {
    /// Create catalog data from albums and tracks
    pub fn new(albums: Vec<Album>, tracks: Vec<Track>) -> Self {
        Self { albums, tracks }
    }
}

/// Trait for loading catalog data from a backing store
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Load the full catalog from the source.
    ///
    /// Called again after a failed load, so implementations must be safe
    /// to re-run from scratch.
    ///
    /// # Returns
    ///
    /// All albums and tracks the source knows about.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::LoadFailed`](crate::CatalogError::LoadFailed)
    /// when the backing store cannot be read.
    async fn load(&self) -> Result<CatalogData>;
}

/// A source backed by a fixed, in-memory data set.
///
/// Useful for demos and tests where the catalog contents are known ahead
/// of time.
pub struct StaticCatalogSource {
    data: CatalogData,
}

impl StaticCatalogSource {
    /// Create a source that always returns the given data
    pub fn new(data: CatalogData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load(&self) -> Result<CatalogData> {
        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_returns_data() {
        let data = CatalogData::new(
            vec![Album::new("a1", "Kind of Blue", "Miles Davis")],
            vec![Track::new("t1", "So What", "Miles Davis", "Kind of Blue")],
        );
        let source = StaticCatalogSource::new(data);

        let loaded = source.load().await.unwrap();
        assert_eq!(loaded.albums.len(), 1);
        assert_eq!(loaded.tracks.len(), 1);
        assert_eq!(loaded.tracks[0].id, "t1");

        // Loading twice yields the same data
        let again = source.load().await.unwrap();
        assert_eq!(again.tracks.len(), 1);
    }
}
