//! # Playback Session Module
//!
//! Orchestrates a media playback session: one queue, one engine, one
//! consolidated state.
//!
//! ## Overview
//!
//! This module manages the playback lifecycle, including:
//! - Building queues from catalog categories, searches, and random samples
//! - Driving a [`PlaybackEngine`](engine_traits::PlaybackEngine) and
//!   reacting to its signals
//! - Shuffle and repeat modes with stable entry identity across reorders
//! - Hot-swapping engines mid-track
//! - Publishing consolidated state over a watch channel and discrete
//!   events over the shared bus
//!
//! ## Components
//!
//! - **Session Handle** (`handle`): Builder plus the clonable command
//!   surface callers hold
//! - **Controller** (`controller`): The task that owns all session state
//!   and serializes every command and engine signal
//! - **Play Queue** (`queue`): Ordered entries with stable ids
//! - **State** (`state`): Consolidated state, repeat modes, available
//!   actions
//! - **Commands** (`commands`): The mailbox protocol
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use core_catalog::{CatalogData, CatalogProvider, StaticCatalogSource};
//! use core_session::SessionBuilder;
//!
//! # async fn run(engine: Arc<dyn engine_traits::PlaybackEngine>) -> core_session::Result<()> {
//! let source = StaticCatalogSource::new(CatalogData::default());
//! let catalog = Arc::new(CatalogProvider::new(Arc::new(source)));
//!
//! let session = SessionBuilder::new()
//!     .with_catalog(catalog)
//!     .with_engine(engine)
//!     .build()
//!     .await?;
//!
//! session.play().await?;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod handle;
pub mod queue;
pub mod state;

mod builder;
mod controller;

pub use commands::{SearchFocus, SessionCommand};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use handle::{SessionBuilder, SessionHandle};
pub use queue::{PlayQueue, QueueEntry, QueueView};
pub use state::{
    AvailableActions, CurrentTrack, RepeatMode, SessionId, SessionState, StateSnapshot,
};
