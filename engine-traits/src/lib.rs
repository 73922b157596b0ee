//! # Playback Engine Traits
//!
//! Contract between the media session core and its playback backends.
//!
//! ## Overview
//!
//! A session controller drives exactly one [`PlaybackEngine`] at a time and
//! may rebind to a different implementation at runtime (local device output,
//! remote receiver, test double). Engines report asynchronous status back
//! through the [`signal`] channel; the controller folds those signals into
//! its own serialized command stream so engine callbacks never mutate
//! session state from foreign threads.
//!
//! ## Crate layout
//!
//! - [`playback`]: [`PlaybackState`], [`PlaybackMetadata`],
//!   [`PlaybackRequest`], and the [`PlaybackEngine`] trait.
//! - [`signal`]: [`EngineSignal`] and the sink/stream pair engines report
//!   through.
//! - [`error`]: [`EngineError`] and the crate [`Result`] alias.
//!
//! ## Thread safety
//!
//! Engines must be `Send + Sync`; they are shared as `Arc<dyn PlaybackEngine>`
//! and their signal sinks may be fired from any thread.

pub mod error;
pub mod playback;
pub mod signal;

pub use error::{EngineError, Result};
pub use playback::{PlaybackEngine, PlaybackMetadata, PlaybackRequest, PlaybackState};
pub use signal::{signal_channel, EngineSignal, SignalSink, SignalStream};
