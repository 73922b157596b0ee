//! Play queue
//!
//! An ordered list of entries, each carrying the track metadata it was
//! built from and a stable id that survives reordering. Stable ids are
//! handed out in build order, so restoring the un-shuffled order is a
//! sort by id; they are never reused within one queue.
//!
//! The queue is pure data. Which entry is current, and what happens when
//! entries move, is the controller's business.

use std::ops::Range;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use core_catalog::{CategoryPath, MediaId, Track};

/// One queue slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Reorder-proof identifier, unique within this queue
    pub stable_id: u64,
    /// Where the entry came from; category plus track id
    pub media_id: MediaId,
    /// Track metadata as of build time
    pub track: Track,
}

impl QueueEntry {
    /// The catalog track id this entry plays
    pub fn track_id(&self) -> &str {
        &self.track.id
    }
}

/// A queue listing handed out to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueView {
    /// Human-readable queue title
    pub title: String,
    /// Position of the current entry, if any
    pub current_index: Option<usize>,
    /// The entries in playback order
    pub entries: Vec<QueueEntry>,
}

/// The session's ordered play queue
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    title: String,
    entries: Vec<QueueEntry>,
    next_stable_id: u64,
}

impl PlayQueue {
    /// An untitled queue with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a queue from tracks resolved out of one category, in the
    /// order given. Stable ids are assigned ascending from zero.
    pub fn from_tracks(
        title: impl Into<String>,
        category: &CategoryPath,
        tracks: Vec<Track>,
    ) -> Self {
        let mut queue = Self { title: title.into(), entries: Vec::new(), next_stable_id: 0 };
        queue.append_tracks(category, tracks);
        queue
    }

    /// Queue title shown to observers
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replace the queue title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in playback order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// The entry at a position, if in bounds
    pub fn entry(&self, pos: usize) -> Option<&QueueEntry> {
        self.entries.get(pos)
    }

    /// Append tracks from one category at the end, continuing the stable
    /// id sequence. Returns the range of positions appended.
    pub fn append_tracks(&mut self, category: &CategoryPath, tracks: Vec<Track>) -> Range<usize> {
        self.insert_tracks(category, tracks, self.entries.len())
    }

    /// Insert tracks from one category at a position, keeping their order
    /// and continuing the stable id sequence. Past-the-end positions clamp
    /// to an append. Returns the range of positions inserted.
    pub fn insert_tracks(
        &mut self,
        category: &CategoryPath,
        tracks: Vec<Track>,
        pos: usize,
    ) -> Range<usize> {
        let pos = pos.min(self.entries.len());
        let count = tracks.len();
        for (offset, track) in tracks.into_iter().enumerate() {
            let stable_id = self.next_stable_id;
            self.next_stable_id += 1;
            let media_id = MediaId::track(category.clone(), track.id.clone());
            self.entries.insert(pos + offset, QueueEntry { stable_id, media_id, track });
        }
        pos..pos + count
    }

    /// Insert one directly-queued track at a position. Returns the stable
    /// id the entry was given.
    pub fn insert_single(&mut self, track: Track, pos: usize) -> u64 {
        let stable_id = self.next_stable_id;
        self.next_stable_id += 1;
        let media_id = MediaId::queued_track(track.id.clone());
        let pos = pos.min(self.entries.len());
        self.entries.insert(pos, QueueEntry { stable_id, media_id, track });
        stable_id
    }

    /// Remove the entry at a position, if in bounds
    pub fn remove_at(&mut self, pos: usize) -> Option<QueueEntry> {
        if pos < self.entries.len() {
            Some(self.entries.remove(pos))
        } else {
            None
        }
    }

    /// Swap two entries. Returns false when either position is out of
    /// bounds.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.entries.len() || b >= self.entries.len() {
            return false;
        }
        self.entries.swap(a, b);
        true
    }

    /// Position of the entry with a stable id
    pub fn position_of_stable(&self, stable_id: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.stable_id == stable_id)
    }

    /// Position of the first entry playing a track id
    pub fn position_of_track(&self, track_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.track_id() == track_id)
    }

    /// Shuffle the whole queue
    pub fn shuffle_all<R: Rng>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
    }

    /// Shuffle the entries within one range of positions
    pub fn shuffle_range<R: Rng>(&mut self, range: Range<usize>, rng: &mut R) {
        if range.end <= self.entries.len() {
            self.entries[range].shuffle(rng);
        }
    }

    /// Shuffle everything except the current entry, which moves to the
    /// front. Returns the current entry's new position (always zero).
    pub fn reshuffle_keeping<R: Rng>(&mut self, current: usize, rng: &mut R) -> usize {
        if current >= self.entries.len() {
            return current;
        }
        let entry = self.entries.remove(current);
        self.entries.shuffle(rng);
        self.entries.insert(0, entry);
        0
    }

    /// Restore build order by sorting on stable ids. Returns the new
    /// position of the entry with the given stable id.
    pub fn restore_order(&mut self, current_stable_id: u64) -> Option<usize> {
        self.entries.sort_by_key(|e| e.stable_id);
        self.position_of_stable(current_stable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{}", i), format!("Track {}", i), "Artist", "Album"))
            .collect()
    }

    #[test]
    fn test_build_assigns_ascending_ids() {
        let queue = PlayQueue::from_tracks("All tracks", &CategoryPath::AllTracks, tracks(3));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.title(), "All tracks");

        let ids: Vec<u64> = queue.entries().iter().map(|e| e.stable_id).collect();
        assert_eq!(ids, [0, 1, 2]);
        assert_eq!(queue.entries()[1].media_id.to_string(), "ALL|t1");
    }

    #[test]
    fn test_append_continues_ids() {
        let mut queue = PlayQueue::from_tracks("Mixed", &CategoryPath::AllTracks, tracks(2));
        let range = queue.append_tracks(
            &CategoryPath::ByAlbum("a1".into()),
            vec![Track::new("x1", "Extra", "Artist", "Album")],
        );
        assert_eq!(range, 2..3);
        assert_eq!(queue.entries()[2].stable_id, 2);
        assert_eq!(queue.entries()[2].media_id.to_string(), "ALBUM/a1|x1");
    }

    #[test]
    fn test_insert_tracks_mid_queue_keeps_order() {
        let mut queue = PlayQueue::from_tracks("Mixed", &CategoryPath::AllTracks, tracks(3));
        let range = queue.insert_tracks(
            &CategoryPath::ByAlbum("a1".into()),
            vec![
                Track::new("x1", "Extra 1", "Artist", "Album"),
                Track::new("x2", "Extra 2", "Artist", "Album"),
            ],
            1,
        );

        assert_eq!(range, 1..3);
        let ids: Vec<&str> = queue.entries().iter().map(|e| e.track_id()).collect();
        assert_eq!(ids, ["t0", "x1", "x2", "t1", "t2"]);

        // Stable ids keep counting up regardless of where entries land
        assert_eq!(queue.entries()[1].stable_id, 3);
        assert_eq!(queue.entries()[2].stable_id, 4);

        // Past-the-end positions clamp to an append
        let range = queue.insert_tracks(
            &CategoryPath::AllTracks,
            vec![Track::new("x3", "Extra 3", "Artist", "Album")],
            99,
        );
        assert_eq!(range, 5..6);
        assert_eq!(queue.entries()[5].track_id(), "x3");
    }

    #[test]
    fn test_insert_single_marks_directly_queued() {
        let mut queue = PlayQueue::from_tracks("Mixed", &CategoryPath::AllTracks, tracks(2));
        let stable_id = queue.insert_single(Track::new("x1", "Extra", "A", "B"), 1);
        assert_eq!(stable_id, 2);
        assert_eq!(queue.entries()[1].media_id.to_string(), "QUEUE|x1");
        assert_eq!(queue.len(), 3);

        // Past-the-end positions clamp to an append
        let stable_id = queue.insert_single(Track::new("x2", "More", "A", "B"), 99);
        assert_eq!(stable_id, 3);
        assert_eq!(queue.entries()[3].track_id(), "x2");
    }

    #[test]
    fn test_swap_and_remove_bounds() {
        let mut queue = PlayQueue::from_tracks("Q", &CategoryPath::AllTracks, tracks(3));
        assert!(queue.swap(0, 2));
        assert_eq!(queue.entries()[0].track_id(), "t2");
        assert!(!queue.swap(0, 3));

        let removed = queue.remove_at(1).unwrap();
        assert_eq!(removed.track_id(), "t1");
        assert!(queue.remove_at(5).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_position_lookups() {
        let queue = PlayQueue::from_tracks("Q", &CategoryPath::AllTracks, tracks(3));
        assert_eq!(queue.position_of_stable(1), Some(1));
        assert_eq!(queue.position_of_stable(7), None);
        assert_eq!(queue.position_of_track("t2"), Some(2));
        assert_eq!(queue.position_of_track("zz"), None);
    }

    #[test]
    fn test_reshuffle_keeps_current_at_front() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut queue = PlayQueue::from_tracks("Q", &CategoryPath::AllTracks, tracks(8));

        let current_track = queue.entries()[5].track_id().to_string();
        let new_pos = queue.reshuffle_keeping(5, &mut rng);

        assert_eq!(new_pos, 0);
        assert_eq!(queue.entries()[0].track_id(), current_track);
        assert_eq!(queue.len(), 8);

        // Membership and ids survive the reorder
        let mut ids: Vec<u64> = queue.entries().iter().map(|e| e.stable_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..8).collect::<Vec<u64>>());
    }

    #[test]
    fn test_restore_order_after_shuffles() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut queue = PlayQueue::from_tracks("Q", &CategoryPath::AllTracks, tracks(6));
        queue.shuffle_all(&mut rng);
        queue.reshuffle_keeping(2, &mut rng);

        let current_stable = queue.entries()[0].stable_id;
        let pos = queue.restore_order(current_stable).unwrap();

        let ids: Vec<u64> = queue.entries().iter().map(|e| e.stable_id).collect();
        assert_eq!(ids, (0..6).collect::<Vec<u64>>());
        assert_eq!(queue.entries()[pos].stable_id, current_stable);
    }

    #[test]
    fn test_shuffle_range_leaves_rest_alone() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut queue = PlayQueue::from_tracks("Q", &CategoryPath::AllTracks, tracks(6));
        queue.shuffle_range(3..6, &mut rng);

        let head: Vec<&str> = queue.entries()[..3].iter().map(|e| e.track_id()).collect();
        assert_eq!(head, ["t0", "t1", "t2"]);

        let mut tail: Vec<&str> = queue.entries()[3..].iter().map(|e| e.track_id()).collect();
        tail.sort_unstable();
        assert_eq!(tail, ["t3", "t4", "t5"]);
    }
}
