//! Session commands
//!
//! Everything a session can be asked to do, as one enum. Commands travel
//! through a bounded mailbox and are handled strictly in arrival order;
//! queries carry a oneshot channel for their answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use core_catalog::MediaId;
use engine_traits::PlaybackEngine;

use crate::queue::QueueView;
use crate::state::StateSnapshot;

/// Which catalog field a search query is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFocus {
    /// No focus given; plays a random sample instead of searching
    Any,
    /// Match against track titles
    Title,
    /// Match against album titles
    Album,
    /// Match against artist names
    Artist,
}

impl SearchFocus {
    /// String representation of the focus
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFocus::Any => "any",
            SearchFocus::Title => "title",
            SearchFocus::Album => "album",
            SearchFocus::Artist => "artist",
        }
    }
}

impl std::fmt::Display for SearchFocus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A command delivered to the session controller
pub enum SessionCommand {
    /// Start or resume playback; seeds a random queue when none exists
    Play,
    /// Pause if playing
    Pause,
    /// Stop playback, optionally publishing an error message
    Stop {
        /// Reason to surface as an error state, if any
        error: Option<String>,
    },
    /// Replace the queue from a media id's category and play its track
    PlayFromId {
        /// Category to build from, optionally narrowed to one track
        media_id: MediaId,
        /// Shuffle the built queue once; the shuffle mode flag stays off
        shuffle: bool,
    },
    /// Replace the queue from a search and start playing
    PlayFromSearch {
        /// Free-text query; empty plays a random sample
        query: String,
        /// Field the query is aimed at
        focus: SearchFocus,
    },
    /// Move to the next entry and play it
    SkipToNext,
    /// Move to the previous entry and play it
    SkipToPrevious,
    /// Jump to the entry with a stable id and play it
    SkipToQueueItem {
        /// Stable id of the target entry
        stable_id: u64,
    },
    /// Seek within the current track
    SeekTo {
        /// Target position in milliseconds
        position_ms: u64,
    },
    /// Add one track or a whole category to the queue without
    /// interrupting playback
    AddToQueue {
        /// What to add; a track id plays that track, a bare category adds
        /// all of its tracks
        media_id: MediaId,
        /// Insert right after the current entry instead of at the end
        play_next: bool,
    },
    /// Remove the entry with a stable id
    RemoveFromQueue {
        /// Stable id of the entry to remove
        stable_id: u64,
    },
    /// Swap two queue positions
    SwapQueueItems {
        /// First position
        pos_a: usize,
        /// Second position
        pos_b: usize,
    },
    /// Flip shuffle mode, reordering the queue around the current entry
    ToggleShuffle,
    /// Cycle the repeat mode
    ToggleRepeat,
    /// Hand playback over to a different engine, carrying state across
    SwitchEngine {
        /// The engine to switch to
        engine: Arc<dyn PlaybackEngine>,
    },
    /// Remove a track from the catalog and scrub it from the queue
    DeleteTrack {
        /// Catalog track id to delete
        track_id: String,
    },
    /// Query the consolidated state plus the live stream position
    CurrentState {
        /// Channel the snapshot is answered on
        reply: oneshot::Sender<StateSnapshot>,
    },
    /// Query the full queue listing
    QueueSnapshot {
        /// Channel the listing is answered on
        reply: oneshot::Sender<QueueView>,
    },
    /// Stop playback and shut the controller down
    Shutdown,
}

impl SessionCommand {
    /// Command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Play => "play",
            SessionCommand::Pause => "pause",
            SessionCommand::Stop { .. } => "stop",
            SessionCommand::PlayFromId { .. } => "play_from_id",
            SessionCommand::PlayFromSearch { .. } => "play_from_search",
            SessionCommand::SkipToNext => "skip_to_next",
            SessionCommand::SkipToPrevious => "skip_to_previous",
            SessionCommand::SkipToQueueItem { .. } => "skip_to_queue_item",
            SessionCommand::SeekTo { .. } => "seek_to",
            SessionCommand::AddToQueue { .. } => "add_to_queue",
            SessionCommand::RemoveFromQueue { .. } => "remove_from_queue",
            SessionCommand::SwapQueueItems { .. } => "swap_queue_items",
            SessionCommand::ToggleShuffle => "toggle_shuffle",
            SessionCommand::ToggleRepeat => "toggle_repeat",
            SessionCommand::SwitchEngine { .. } => "switch_engine",
            SessionCommand::DeleteTrack { .. } => "delete_track",
            SessionCommand::CurrentState { .. } => "current_state",
            SessionCommand::QueueSnapshot { .. } => "queue_snapshot",
            SessionCommand::Shutdown => "shutdown",
        }
    }

    /// Whether the command only reads state. Queries do not count as
    /// activity for the idle timer.
    pub(crate) fn is_query(&self) -> bool {
        matches!(
            self,
            SessionCommand::CurrentState { .. } | SessionCommand::QueueSnapshot { .. }
        )
    }
}
