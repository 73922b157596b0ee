//! # Local Playback Engine
//!
//! In-process reference backend for the playback session stack. Implements
//! [`engine_traits::PlaybackEngine`] over a simulated timeline driven by
//! the runtime clock: no audio is decoded or rendered, but position,
//! pause/resume, seeking, stopping and end-of-track completion all behave
//! the way a real output would, which is enough to exercise a session
//! controller end to end.
//!
//! ## Usage
//!
//! ```no_run
//! use engine_local::{LocalEngine, LocalEngineConfig};
//! use engine_traits::{PlaybackEngine, PlaybackMetadata, PlaybackRequest, signal_channel};
//!
//! # async fn run() -> engine_traits::Result<()> {
//! let engine = LocalEngine::new(LocalEngineConfig::default())?;
//!
//! // The owner keeps the stream and folds signals into its own loop
//! let (sink, mut signals) = signal_channel();
//! engine.bind(sink);
//! engine.start().await?;
//!
//! let metadata = PlaybackMetadata::new("t1", "So What").with_duration_ms(545_000);
//! engine.play(PlaybackRequest::new(metadata)).await?;
//!
//! while let Some(signal) = signals.recv().await {
//!     println!("engine says: {:?}", signal);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;

pub use config::LocalEngineConfig;
pub use engine::LocalEngine;
