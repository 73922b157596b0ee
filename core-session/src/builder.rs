//! Queue construction
//!
//! Turns a browsable category, a search, or a random sample of the
//! catalog into a fresh [`PlayQueue`]. Stable ids always reflect catalog
//! order because they are assigned before any shuffling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use core_catalog::{CatalogProvider, CategoryPath, Result, Track};

use crate::commands::SearchFocus;
use crate::queue::PlayQueue;

/// Category value stamped on entries of randomly sampled queues
const RANDOM_QUEUE_VALUE: &str = "random";

/// Resolve the tracks of one category, in catalog order. The
/// non-browsable `Queue` category resolves to nothing.
pub(crate) async fn tracks_for_category(
    catalog: &CatalogProvider,
    category: &CategoryPath,
) -> Result<Vec<Track>> {
    match category {
        CategoryPath::AllTracks => catalog.all_tracks().await,
        CategoryPath::ByAlbum(album_id) => catalog.tracks_by_album(album_id).await,
        CategoryPath::ByArtist(artist) => catalog.tracks_by_artist(artist).await,
        CategoryPath::BySearch(query) => catalog.search_by_title(query).await,
        CategoryPath::Queue => {
            debug!("Directly-queued entries have no browsable category");
            Ok(Vec::new())
        }
    }
}

/// Display title for a category. Album queues are titled after the album
/// when it is known; everything else uses the generic label.
pub(crate) async fn title_for_category(
    catalog: &CatalogProvider,
    category: &CategoryPath,
) -> String {
    if let CategoryPath::ByAlbum(album_id) = category {
        if let Ok(album) = catalog.album(album_id).await {
            return format!("Album: {}", album.title);
        }
    }
    category.label()
}

/// Build a queue holding every track of one category, in catalog order.
pub(crate) async fn queue_for_category(
    catalog: &CatalogProvider,
    category: &CategoryPath,
) -> Result<PlayQueue> {
    let tracks = tracks_for_category(catalog, category).await?;
    let title = title_for_category(catalog, category).await;
    Ok(PlayQueue::from_tracks(title, category, tracks))
}

/// Build a queue from a roughly-half random sample of the catalog,
/// shuffled. Small catalogs can produce an empty sample.
pub(crate) async fn random_queue(catalog: &CatalogProvider, title: &str) -> Result<PlayQueue> {
    // The rng is held across the catalog await inside a spawned task, so
    // it has to be Send; thread_rng is not
    let mut rng = StdRng::from_entropy();
    random_queue_with_rng(catalog, title, &mut rng).await
}

pub(crate) async fn random_queue_with_rng<R: Rng>(
    catalog: &CatalogProvider,
    title: &str,
    rng: &mut R,
) -> Result<PlayQueue> {
    let sampled: Vec<Track> = catalog
        .all_tracks()
        .await?
        .into_iter()
        .filter(|_| rng.gen_bool(0.5))
        .collect();
    let category = CategoryPath::BySearch(RANDOM_QUEUE_VALUE.to_string());
    let mut queue = PlayQueue::from_tracks(title, &category, sampled);
    queue.shuffle_all(rng);
    Ok(queue)
}

/// Build a queue from a search. Album and artist focus fall back to a
/// title search when the focused field matches nothing; the result can
/// still be empty.
pub(crate) async fn search_queue(
    catalog: &CatalogProvider,
    query: &str,
    focus: SearchFocus,
) -> Result<PlayQueue> {
    let query = query.trim();
    let mut tracks = match focus {
        SearchFocus::Any | SearchFocus::Title => catalog.search_by_title(query).await?,
        SearchFocus::Album => catalog.search_by_album(query).await?,
        SearchFocus::Artist => catalog.search_by_artist(query).await?,
    };
    if tracks.is_empty() && matches!(focus, SearchFocus::Album | SearchFocus::Artist) {
        debug!(query, focus = focus.as_str(), "Focused search empty, retrying on titles");
        tracks = catalog.search_by_title(query).await?;
    }
    let category = CategoryPath::BySearch(query.to_string());
    Ok(PlayQueue::from_tracks(category.label(), &category, tracks))
}
