//! Catalog provider
//!
//! In-memory catalog built from a [`CatalogSource`], with lookup indexes
//! by track id, album and artist. Loading is lazy and retryable:
//!
//! ```text
//! NotInitialized ──ensure_ready()──▶ Initializing ──ok──▶ Initialized
//!        ▲                                │
//!        └──────────── load error ────────┘
//! ```
//!
//! A failed load puts the provider back to `NotInitialized`, so the next
//! `ensure_ready()` call retries from scratch. Concurrent callers share a
//! single load; queries before the first successful load return
//! [`CatalogError::NotReady`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::models::{normalize, Album, Track};
use crate::source::{CatalogData, CatalogSource};

// ============================================================================
// Load state
// ============================================================================

/// Lifecycle of the in-memory catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet, or the last load failed
    NotInitialized,
    /// A load is in flight
    Initializing,
    /// The catalog is queryable
    Initialized,
}

impl LoadState {
    /// String representation of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::NotInitialized => "not_initialized",
            LoadState::Initializing => "initializing",
            LoadState::Initialized => "initialized",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Provider
// ============================================================================

#[derive(Default)]
struct Indexes {
    loaded: bool,
    /// Track ids in catalog order
    track_order: Vec<String>,
    tracks_by_id: HashMap<String, Track>,
    albums_by_id: HashMap<String, Album>,
    /// Album id to track ids, in catalog order
    tracks_by_album: HashMap<String, Vec<String>>,
    /// Exact artist name to track ids, in catalog order
    tracks_by_artist: HashMap<String, Vec<String>>,
}

/// Lazily loaded, queryable catalog of tracks and albums
pub struct CatalogProvider {
    source: Arc<dyn CatalogSource>,
    /// Serializes loads so concurrent `ensure_ready` calls coalesce
    load_lock: Mutex<()>,
    state: RwLock<LoadState>,
    indexes: RwLock<Indexes>,
}

impl CatalogProvider {
    /// Create a provider over the given source. Nothing is loaded until
    /// the first call to [`ensure_ready`](Self::ensure_ready).
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            load_lock: Mutex::new(()),
            state: RwLock::new(LoadState::NotInitialized),
            indexes: RwLock::new(Indexes::default()),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> LoadState {
        *self.state.read().await
    }

    /// Whether the catalog is queryable
    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == LoadState::Initialized
    }

    /// Load the catalog if it has not been loaded yet.
    ///
    /// Safe to call from any number of tasks; only one load runs at a
    /// time and later callers reuse its result. After a failure the state
    /// is reset so a subsequent call retries.
    ///
    /// # Returns
    ///
    /// The number of tracks in the catalog.
    ///
    /// # Errors
    ///
    /// Propagates the source error when loading fails.
    pub async fn ensure_ready(&self) -> Result<usize> {
        if self.is_ready().await {
            return Ok(self.track_count().await);
        }

        let _guard = self.load_lock.lock().await;
        // Another caller may have finished the load while we waited.
        if self.is_ready().await {
            return Ok(self.track_count().await);
        }

        *self.state.write().await = LoadState::Initializing;
        debug!("Catalog load starting");

        match self.source.load().await {
            Ok(data) => {
                let mut indexes = self.indexes.write().await;
                *indexes = Self::build_indexes(data);
                let tracks = indexes.track_order.len();
                let albums = indexes.albums_by_id.len();
                drop(indexes);

                *self.state.write().await = LoadState::Initialized;
                info!(tracks, albums, "Catalog loaded");
                Ok(tracks)
            }
            Err(e) => {
                *self.state.write().await = LoadState::NotInitialized;
                warn!(error = %e, "Catalog load failed");
                Err(e)
            }
        }
    }

    /// Number of tracks currently held, zero when not loaded
    pub async fn track_count(&self) -> usize {
        self.indexes.read().await.track_order.len()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All tracks in catalog order
    pub async fn all_tracks(&self) -> Result<Vec<Track>> {
        let indexes = self.ready_indexes().await?;
        Ok(indexes
            .track_order
            .iter()
            .filter_map(|id| indexes.tracks_by_id.get(id).cloned())
            .collect())
    }

    /// Tracks belonging to an album, empty when the album has none
    pub async fn tracks_by_album(&self, album_id: &str) -> Result<Vec<Track>> {
        let indexes = self.ready_indexes().await?;
        Ok(Self::collect_ids(&indexes, indexes.tracks_by_album.get(album_id)))
    }

    /// Tracks by an artist, matched on the exact artist name
    pub async fn tracks_by_artist(&self, artist: &str) -> Result<Vec<Track>> {
        let indexes = self.ready_indexes().await?;
        Ok(Self::collect_ids(&indexes, indexes.tracks_by_artist.get(artist)))
    }

    /// Tracks whose title contains the query, case-insensitively
    pub async fn search_by_title(&self, query: &str) -> Result<Vec<Track>> {
        self.search_field(query, |t| &t.title).await
    }

    /// Tracks whose album title contains the query, case-insensitively
    pub async fn search_by_album(&self, query: &str) -> Result<Vec<Track>> {
        self.search_field(query, |t| &t.album).await
    }

    /// Tracks whose artist contains the query, case-insensitively
    pub async fn search_by_artist(&self, query: &str) -> Result<Vec<Track>> {
        self.search_field(query, |t| &t.artist).await
    }

    /// Look up a single track
    ///
    /// # Errors
    ///
    /// [`CatalogError::TrackNotFound`] when no track has this id.
    pub async fn track(&self, track_id: &str) -> Result<Track> {
        let indexes = self.ready_indexes().await?;
        indexes
            .tracks_by_id
            .get(track_id)
            .cloned()
            .ok_or_else(|| CatalogError::TrackNotFound(track_id.to_string()))
    }

    /// Look up a single album
    ///
    /// # Errors
    ///
    /// [`CatalogError::AlbumNotFound`] when no album has this id.
    pub async fn album(&self, album_id: &str) -> Result<Album> {
        let indexes = self.ready_indexes().await?;
        indexes
            .albums_by_id
            .get(album_id)
            .cloned()
            .ok_or_else(|| CatalogError::AlbumNotFound(album_id.to_string()))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Replace a track's metadata, keyed by `track.id`.
    ///
    /// Tracks keep their catalog position. Album and artist groupings are
    /// refreshed only when those fields changed.
    ///
    /// # Errors
    ///
    /// [`CatalogError::TrackNotFound`] when the track is not in the
    /// catalog, [`CatalogError::InvalidInput`] when the new metadata does
    /// not validate.
    pub async fn update_track(&self, track: Track) -> Result<()> {
        track
            .validate()
            .map_err(|message| CatalogError::InvalidInput { field: "track".to_string(), message })?;

        let mut indexes = self.indexes.write().await;
        if !indexes.loaded {
            return Err(CatalogError::NotReady);
        }
        let old = indexes
            .tracks_by_id
            .get(&track.id)
            .cloned()
            .ok_or_else(|| CatalogError::TrackNotFound(track.id.clone()))?;

        if old.album_id != track.album_id || old.artist != track.artist {
            Self::unindex_groups(&mut indexes, &old);
            Self::index_groups(&mut indexes, &track);
        }
        debug!(track_id = %track.id, "Track metadata updated");
        indexes.tracks_by_id.insert(track.id.clone(), track);
        Ok(())
    }

    /// Remove a track from the catalog and every index.
    ///
    /// # Returns
    ///
    /// `true` when the track existed.
    pub async fn delete_track(&self, track_id: &str) -> Result<bool> {
        let mut indexes = self.indexes.write().await;
        if !indexes.loaded {
            return Err(CatalogError::NotReady);
        }
        let Some(track) = indexes.tracks_by_id.remove(track_id) else {
            return Ok(false);
        };
        indexes.track_order.retain(|id| id != track_id);
        Self::unindex_groups(&mut indexes, &track);
        info!(track_id, "Track removed from catalog");
        Ok(true)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn ready_indexes(&self) -> Result<tokio::sync::RwLockReadGuard<'_, Indexes>> {
        let indexes = self.indexes.read().await;
        if indexes.loaded {
            Ok(indexes)
        } else {
            Err(CatalogError::NotReady)
        }
    }

    async fn search_field(&self, query: &str, field: impl Fn(&Track) -> &str) -> Result<Vec<Track>> {
        let needle = normalize(query);
        let indexes = self.ready_indexes().await?;
        Ok(indexes
            .track_order
            .iter()
            .filter_map(|id| indexes.tracks_by_id.get(id))
            .filter(|track| normalize(field(track)).contains(&needle))
            .cloned()
            .collect())
    }

    fn collect_ids(indexes: &Indexes, ids: Option<&Vec<String>>) -> Vec<Track> {
        ids.map(|ids| {
            ids.iter().filter_map(|id| indexes.tracks_by_id.get(id).cloned()).collect()
        })
        .unwrap_or_default()
    }

    fn build_indexes(data: CatalogData) -> Indexes {
        let mut indexes = Indexes { loaded: true, ..Indexes::default() };
        for album in data.albums {
            if let Err(message) = album.validate() {
                warn!(album_id = %album.id, message, "Skipping invalid album");
                continue;
            }
            indexes.albums_by_id.insert(album.id.clone(), album);
        }
        for track in data.tracks {
            if let Err(message) = track.validate() {
                warn!(track_id = %track.id, message, "Skipping invalid track");
                continue;
            }
            if indexes.tracks_by_id.contains_key(&track.id) {
                warn!(track_id = %track.id, "Skipping duplicate track id");
                continue;
            }
            indexes.track_order.push(track.id.clone());
            Self::index_groups(&mut indexes, &track);
            indexes.tracks_by_id.insert(track.id.clone(), track);
        }
        indexes
    }

    fn index_groups(indexes: &mut Indexes, track: &Track) {
        if let Some(album_id) = &track.album_id {
            indexes
                .tracks_by_album
                .entry(album_id.clone())
                .or_default()
                .push(track.id.clone());
        }
        indexes
            .tracks_by_artist
            .entry(track.artist.clone())
            .or_default()
            .push(track.id.clone());
    }

    fn unindex_groups(indexes: &mut Indexes, track: &Track) {
        if let Some(album_id) = &track.album_id {
            if let Some(ids) = indexes.tracks_by_album.get_mut(album_id) {
                ids.retain(|id| id != &track.id);
                if ids.is_empty() {
                    indexes.tracks_by_album.remove(album_id);
                }
            }
        }
        if let Some(ids) = indexes.tracks_by_artist.get_mut(&track.artist) {
            ids.retain(|id| id != &track.id);
            if ids.is_empty() {
                indexes.tracks_by_artist.remove(&track.artist);
            }
        }
    }
}

impl std::fmt::Debug for CatalogProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogProvider").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticCatalogSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fixture() -> CatalogData {
        CatalogData::new(
            vec![
                Album::new("a1", "Kind of Blue", "Miles Davis"),
                Album::new("a2", "A Love Supreme", "John Coltrane"),
            ],
            vec![
                Track::new("t1", "So What", "Miles Davis", "Kind of Blue")
                    .with_album_id("a1")
                    .with_duration_ms(545_000)
                    .with_track_number(1),
                Track::new("t2", "Blue in Green", "Miles Davis", "Kind of Blue")
                    .with_album_id("a1")
                    .with_duration_ms(337_000)
                    .with_track_number(3),
                Track::new("t3", "Acknowledgement", "John Coltrane", "A Love Supreme")
                    .with_album_id("a2")
                    .with_duration_ms(462_000)
                    .with_track_number(1),
                Track::new("t4", "Resolution", "John Coltrane", "A Love Supreme")
                    .with_album_id("a2")
                    .with_duration_ms(441_000)
                    .with_track_number(2),
            ],
        )
    }

    fn provider() -> CatalogProvider {
        CatalogProvider::new(Arc::new(StaticCatalogSource::new(fixture())))
    }

    /// Counts loads and fails the first `failures` of them
    struct FlakySource {
        loads: AtomicUsize,
        failures: usize,
    }

    impl FlakySource {
        fn new(failures: usize) -> Self {
            Self { loads: AtomicUsize::new(0), failures }
        }
    }

    #[async_trait]
    impl CatalogSource for FlakySource {
        async fn load(&self) -> Result<CatalogData> {
            // Give overlapping callers a chance to pile up on the lock
            tokio::time::sleep(Duration::from_millis(10)).await;
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(CatalogError::LoadFailed("store offline".to_string()))
            } else {
                Ok(fixture())
            }
        }
    }

    #[tokio::test]
    async fn test_queries_fail_before_load() {
        let provider = provider();
        assert_eq!(provider.state().await, LoadState::NotInitialized);
        assert!(!provider.is_ready().await);

        assert!(matches!(provider.all_tracks().await, Err(CatalogError::NotReady)));
        assert!(matches!(provider.track("t1").await, Err(CatalogError::NotReady)));
        assert!(matches!(provider.search_by_title("blue").await, Err(CatalogError::NotReady)));
        assert!(matches!(provider.delete_track("t1").await, Err(CatalogError::NotReady)));
    }

    #[tokio::test]
    async fn test_load_builds_indexes() {
        let provider = provider();
        let count = provider.ensure_ready().await.unwrap();
        assert_eq!(count, 4);
        assert_eq!(provider.state().await, LoadState::Initialized);

        let all: Vec<String> =
            provider.all_tracks().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(all, ["t1", "t2", "t3", "t4"]);

        let album: Vec<String> =
            provider.tracks_by_album("a1").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(album, ["t1", "t2"]);

        let artist: Vec<String> = provider
            .tracks_by_artist("John Coltrane")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(artist, ["t3", "t4"]);

        // Unknown keys are empty, not errors
        assert!(provider.tracks_by_album("zz").await.unwrap().is_empty());
        assert!(provider.tracks_by_artist("Nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_track_and_album_lookup() {
        let provider = provider();
        provider.ensure_ready().await.unwrap();

        let track = provider.track("t3").await.unwrap();
        assert_eq!(track.title, "Acknowledgement");
        assert!(matches!(
            provider.track("t99").await,
            Err(CatalogError::TrackNotFound(id)) if id == "t99"
        ));

        let album = provider.album("a2").await.unwrap();
        assert_eq!(album.title, "A Love Supreme");
        assert!(matches!(provider.album("a99").await, Err(CatalogError::AlbumNotFound(_))));
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let source = Arc::new(FlakySource::new(0));
        let provider = CatalogProvider::new(source.clone());

        provider.ensure_ready().await.unwrap();
        provider.ensure_ready().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_resets_for_retry() {
        let source = Arc::new(FlakySource::new(1));
        let provider = CatalogProvider::new(source.clone());

        let err = provider.ensure_ready().await.unwrap_err();
        assert!(matches!(err, CatalogError::LoadFailed(_)));
        assert_eq!(provider.state().await, LoadState::NotInitialized);
        assert!(matches!(provider.all_tracks().await, Err(CatalogError::NotReady)));

        let count = provider.ensure_ready().await.unwrap();
        assert_eq!(count, 4);
        assert!(provider.is_ready().await);
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_coalesce() {
        let source = Arc::new(FlakySource::new(0));
        let provider = Arc::new(CatalogProvider::new(source.clone()));

        let (a, b, c, d) = tokio::join!(
            provider.ensure_ready(),
            provider.ensure_ready(),
            provider.ensure_ready(),
            provider.ensure_ready(),
        );
        assert_eq!(a.unwrap(), 4);
        assert_eq!(b.unwrap(), 4);
        assert_eq!(c.unwrap(), 4);
        assert_eq!(d.unwrap(), 4);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_per_field() {
        let provider = provider();
        provider.ensure_ready().await.unwrap();

        let titles: Vec<String> =
            provider.search_by_title("BLUE").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(titles, ["t2"]);

        let albums: Vec<String> =
            provider.search_by_album("blue").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(albums, ["t1", "t2"]);

        let artists: Vec<String> =
            provider.search_by_artist("coltrane").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(artists, ["t3", "t4"]);

        assert!(provider.search_by_title("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_track_scrubs_every_index() {
        let provider = provider();
        provider.ensure_ready().await.unwrap();

        assert!(provider.delete_track("t1").await.unwrap());
        assert!(!provider.delete_track("t1").await.unwrap());

        assert!(matches!(provider.track("t1").await, Err(CatalogError::TrackNotFound(_))));
        let all: Vec<String> =
            provider.all_tracks().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(all, ["t2", "t3", "t4"]);

        let album: Vec<String> =
            provider.tracks_by_album("a1").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(album, ["t2"]);
        let artist: Vec<String> = provider
            .tracks_by_artist("Miles Davis")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(artist, ["t2"]);
        assert_eq!(provider.track_count().await, 3);
    }

    #[tokio::test]
    async fn test_update_track_keeps_position() {
        let provider = provider();
        provider.ensure_ready().await.unwrap();

        let updated = provider.track("t2").await.unwrap().with_duration_ms(340_000);
        provider.update_track(updated).await.unwrap();

        assert_eq!(provider.track("t2").await.unwrap().duration_ms, 340_000);
        let album: Vec<String> =
            provider.tracks_by_album("a1").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(album, ["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_update_track_moves_between_groups() {
        let provider = provider();
        provider.ensure_ready().await.unwrap();

        let mut moved = provider.track("t2").await.unwrap();
        moved.album_id = Some("a2".to_string());
        moved.artist = "John Coltrane".to_string();
        provider.update_track(moved).await.unwrap();

        let a1: Vec<String> =
            provider.tracks_by_album("a1").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(a1, ["t1"]);
        let a2: Vec<String> =
            provider.tracks_by_album("a2").await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(a2, ["t3", "t4", "t2"]);
        assert!(provider.tracks_by_artist("Miles Davis").await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_update_unknown_or_invalid_track() {
        let provider = provider();
        provider.ensure_ready().await.unwrap();

        let unknown = Track::new("t99", "Ghost", "Nobody", "Nothing");
        assert!(matches!(
            provider.update_track(unknown).await,
            Err(CatalogError::TrackNotFound(_))
        ));

        let invalid = Track::new("t1", "", "Miles Davis", "Kind of Blue");
        assert!(matches!(
            provider.update_track(invalid).await,
            Err(CatalogError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_and_duplicate_rows_skipped() {
        let mut data = fixture();
        data.tracks.push(Track::new("t1", "Duplicate", "X", "Y"));
        data.tracks.push(Track::new("", "No id", "X", "Y"));
        let provider = CatalogProvider::new(Arc::new(StaticCatalogSource::new(data)));

        let count = provider.ensure_ready().await.unwrap();
        assert_eq!(count, 4);
        assert_eq!(provider.track("t1").await.unwrap().title, "So What");
    }
}
