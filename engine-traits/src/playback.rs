//! # Playback Engine Contract
//!
//! Defines the polymorphic contract between a session controller and the
//! backends that actually render audio (a local device output, a remote
//! receiver, a test double). The controller owns exactly one engine at a
//! time and drives it through [`PlaybackEngine`]; asynchronous status
//! comes back over the signal channel from [`crate::signal`].
//!
//! ## Architecture
//!
//! ```text
//! Session Controller ──play/pause/stop/seek──▶ PlaybackEngine (Local | Remote)
//!         ▲                                            │
//!         └─────── EngineSignal (completed, state, ────┘
//!                  error, track loaded) via SignalSink
//! ```
//!
//! ## Contract notes
//!
//! - Control methods are async and may perform I/O; status getters are
//!   synchronous and return the engine's last-known values so the controller
//!   can snapshot state without awaiting (required during an engine switch).
//! - `stop(notify: false)` must suppress the engine's own `StateChanged`
//!   signal for that stop. The controller uses this while switching engines
//!   so the outgoing engine's shutdown does not masquerade as a session
//!   state change.
//! - `set_position_ms` / `set_current_track_id` prime an engine with state
//!   captured from its predecessor before `start()` during a switch; outside
//!   of a switch the controller never calls them.

use crate::error::Result;
use crate::signal::SignalSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Playback State
// ============================================================================

/// The finite playback lifecycle reported by engines and republished by the
/// session controller.
///
/// Exactly one value holds at a time. `Idle` is the initial no-session
/// state; `Error` carries a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    /// No session, nothing loaded.
    Idle,
    /// Waiting on an external dependency (catalog load, remote receiver).
    Connecting,
    /// A track is loaded and buffering before output starts.
    Buffering,
    /// Audio is being rendered.
    Playing,
    /// Playback halted, position retained.
    Paused,
    /// Playback halted, session quiesced.
    Stopped,
    /// A fault occurred; the session stays addressable.
    Error { message: String },
}

impl PlaybackState {
    /// True only for [`PlaybackState::Playing`].
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// True while a track is loaded and the session is engaged
    /// (playing, paused, buffering, or connecting).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Connecting
                | PlaybackState::Buffering
                | PlaybackState::Playing
                | PlaybackState::Paused
        )
    }

    /// Short lowercase label for logs and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Connecting => "connecting",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Error { .. } => "error",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Playback Metadata & Request
// ============================================================================

/// Display metadata for the track an engine is asked to play.
///
/// Engines surface this to whatever output they drive (lock screens, remote
/// receivers); they never consult the catalog themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    /// Catalog track id.
    pub track_id: String,
    /// Track title.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Album title.
    pub album: String,
    /// Track duration in milliseconds, when known.
    pub duration_ms: Option<u64>,
    /// Additional key-value metadata.
    pub extra: HashMap<String, String>,
}

impl PlaybackMetadata {
    /// Create metadata with the required identity fields.
    pub fn new(track_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            duration_ms: None,
            extra: HashMap::new(),
        }
    }

    /// Set the artist name.
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// Set the album title.
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    /// Set the track duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attach one extra metadata entry.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A fully-resolved playback instruction.
///
/// Built by the session controller from the queue entry at the current
/// index; carries everything an engine needs so engines stay catalog-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    /// Track display metadata.
    pub metadata: PlaybackMetadata,
    /// Locator for the audio data (path or URL), when the backend needs one.
    pub source: Option<String>,
    /// Position to start from, in milliseconds.
    pub start_position_ms: u64,
    /// Backend-specific options.
    pub options: HashMap<String, String>,
}

impl PlaybackRequest {
    /// Create a request starting at position zero.
    pub fn new(metadata: PlaybackMetadata) -> Self {
        Self {
            metadata,
            source: None,
            start_position_ms: 0,
            options: HashMap::new(),
        }
    }

    /// Set the audio source locator.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the starting position.
    pub fn with_start_position(mut self, position_ms: u64) -> Self {
        self.start_position_ms = position_ms;
        self
    }

    /// Attach one backend option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The catalog track id this request plays.
    pub fn track_id(&self) -> &str {
        &self.metadata.track_id
    }
}

// ============================================================================
// Engine Trait
// ============================================================================

/// A playback backend the session controller can drive.
///
/// Implementations must be `Send + Sync`; the controller holds them behind
/// `Arc<dyn PlaybackEngine>` and may invoke control methods from its own
/// task while the engine's internals run elsewhere.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Bring the engine to a connected, ready state. Called once when the
    /// engine becomes the active backend (including after a switch).
    async fn start(&self) -> Result<()>;

    /// Halt playback and release output resources.
    ///
    /// With `notify == false` the engine must not emit a `StateChanged`
    /// signal for this stop; the controller uses that form when it is about
    /// to publish a state itself (stop-with-reason, engine switch).
    async fn stop(&self, notify: bool) -> Result<()>;

    /// Load and play a track.
    async fn play(&self, request: PlaybackRequest) -> Result<()>;

    /// Pause output, retaining position. Pausing while already paused or
    /// stopped is a no-op, not an error.
    async fn pause(&self) -> Result<()>;

    /// Seek within the current track.
    async fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Short human-readable backend label (e.g. "local"), used in logs and
    /// switch notifications.
    fn name(&self) -> &str;

    /// Last-known playback state.
    fn state(&self) -> PlaybackState;

    /// Whether the backend's output is reachable (always true for a local
    /// device; connectivity-dependent for a remote receiver).
    fn is_connected(&self) -> bool;

    /// Whether audio is actively being rendered.
    fn is_playing(&self) -> bool;

    /// Last-known stream position in milliseconds.
    fn position_ms(&self) -> u64;

    /// Prime the stream position before `start()` during an engine switch.
    fn set_position_ms(&self, position_ms: u64);

    /// Track id the engine currently considers loaded, if any.
    fn current_track_id(&self) -> Option<String>;

    /// Prime the current track id before `start()` during an engine switch.
    fn set_current_track_id(&self, track_id: Option<String>);

    /// Attach the signal sink this engine reports through. Rebinding
    /// replaces any previous sink.
    fn bind(&self, sink: SignalSink);
}

// ============================================================================
// Tests
// ============================================================================
