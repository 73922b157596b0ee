//! Published session state
//!
//! The controller condenses everything an observer needs into one
//! [`SessionState`] value and publishes it through a `tokio::sync::watch`
//! channel, so late subscribers always see the latest snapshot. Discrete
//! notifications travel separately on the event bus.

use engine_traits::PlaybackState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::queue::QueueEntry;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SessionId> for Uuid {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

// ============================================================================
// Repeat Mode
// ============================================================================

/// What happens when the current track finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Advance through the queue once, then stop
    None,
    /// Wrap to the first entry after the last
    All,
    /// Replay the current entry forever
    One,
}

impl RepeatMode {
    /// String representation of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }

    /// The mode a repeat toggle moves to: none, all, one, and back around
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }
}

impl Default for RepeatMode {
    fn default() -> Self {
        RepeatMode::None
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Available Actions
// ============================================================================

/// Which commands make sense in the current session state.
///
/// Observers use this to enable or disable controls without re-deriving
/// queue rules themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailableActions {
    /// Starting or resuming playback
    pub play: bool,
    /// Playing a specific media id
    pub play_from_id: bool,
    /// Playing from a search query
    pub play_from_search: bool,
    /// Pausing, offered only while playing
    pub pause: bool,
    /// Moving to the previous entry, offered when not at the first
    pub skip_to_previous: bool,
    /// Moving to the next entry, offered when not at the last
    pub skip_to_next: bool,
}

impl AvailableActions {
    /// Derive the action set from the playback and queue position
    pub fn for_position(playing: bool, index: Option<usize>, queue_len: usize) -> Self {
        let (skip_to_previous, skip_to_next) = match index {
            Some(i) if queue_len > 0 => (i > 0, i + 1 < queue_len),
            _ => (false, false),
        };
        Self {
            play: true,
            play_from_id: true,
            play_from_search: true,
            pause: playing,
            skip_to_previous,
            skip_to_next,
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Metadata of the entry at the current queue position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTrack {
    /// Catalog track id
    pub track_id: String,
    /// Track title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Album title
    pub album: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Position of the entry in the queue
    pub index: usize,
}

/// Consolidated session snapshot published on every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Identifier of the session that published this state
    pub session_id: SessionId,
    /// Whether the session is activated (has started playback since the
    /// last deactivation)
    pub active: bool,
    /// Playback lifecycle state
    pub playback: PlaybackState,
    /// Current track metadata, if a queue entry is selected
    pub track: Option<CurrentTrack>,
    /// Human-readable queue title
    pub queue_title: String,
    /// The queue entries in playback order
    pub queue: Vec<QueueEntry>,
    /// Whether the queue is in shuffled order
    pub shuffling: bool,
    /// Repeat behavior at track completion
    pub repeat: RepeatMode,
    /// Commands that make sense right now
    pub actions: AvailableActions,
    /// Name of the engine currently bound
    pub engine: String,
}

impl SessionState {
    /// The state published before any command has run
    pub(crate) fn initial(session_id: SessionId, engine: &str) -> Self {
        Self {
            session_id,
            active: false,
            playback: PlaybackState::Idle,
            track: None,
            queue_title: String::new(),
            queue: Vec::new(),
            shuffling: false,
            repeat: RepeatMode::None,
            actions: AvailableActions::for_position(false, None, 0),
            engine: engine.to_string(),
        }
    }
}

/// A point-in-time answer to a state query, including the stream position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// The published session state at the time of the query
    pub state: SessionState,
    /// Engine stream position in milliseconds
    pub position_ms: u64,
}
