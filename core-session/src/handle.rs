//! Session construction and the public command surface
//!
//! [`SessionBuilder`] wires a catalog, an engine and an event bus into a
//! running controller task. [`SessionHandle`] is the cheap clonable front
//! for it: fire-and-forget command senders plus two snapshot queries.
//! Dropping every handle (without calling [`SessionHandle::shutdown`])
//! also winds the controller down.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

use core_catalog::{CatalogProvider, MediaId};
use core_runtime::events::{EventBus, EventStream};
use engine_traits::PlaybackEngine;

use crate::commands::{SearchFocus, SessionCommand};
use crate::config::SessionConfig;
use crate::controller::SessionController;
use crate::error::{Result, SessionError};
use crate::queue::QueueView;
use crate::state::{SessionId, SessionState, StateSnapshot};

// ============================================================================
// SessionBuilder
// ============================================================================

/// Assembles and starts a playback session.
///
/// A catalog provider and a playback engine are required; the config and
/// the event bus fall back to defaults. `build` starts the engine, spawns
/// the controller task and returns the first handle.
#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    catalog: Option<Arc<CatalogProvider>>,
    engine: Option<Arc<dyn PlaybackEngine>>,
    events: Option<EventBus>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<CatalogProvider>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn PlaybackEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Share an existing bus instead of letting the session create one.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn build(self) -> Result<SessionHandle> {
        self.config.validate().map_err(SessionError::Config)?;
        let catalog = self
            .catalog
            .ok_or_else(|| SessionError::Config("a catalog provider is required".to_string()))?;
        let engine = self
            .engine
            .ok_or_else(|| SessionError::Config("a playback engine is required".to_string()))?;
        let events = self
            .events
            .unwrap_or_else(|| EventBus::new(self.config.event_buffer_size));

        let (controller, commands, state, signal_tx) =
            SessionController::new(self.config, catalog, Arc::clone(&engine), events.clone());
        let session_id = controller.session_id();

        engine.bind(signal_tx);
        engine.start().await?;
        tokio::spawn(controller.run());
        info!(session_id = %session_id, engine = engine.name(), "Session started");

        Ok(SessionHandle { session_id, commands, state, events })
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Clonable front for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    events: EventBus,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Watch receiver for the consolidated state. `borrow` gives the
    /// latest value immediately; `changed` awaits the next publication.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Subscribe to discrete events. Only events emitted after the call
    /// are delivered; [`EventStream::filter`] narrows the stream.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub async fn play(&self) -> Result<()> {
        self.send(SessionCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(SessionCommand::Stop { error: None }).await
    }

    /// Replace the queue from a media id and start playing. With `shuffle`
    /// the built queue is shuffled once, without turning shuffle mode on.
    pub async fn play_from_id(&self, media_id: MediaId, shuffle: bool) -> Result<()> {
        self.send(SessionCommand::PlayFromId { media_id, shuffle }).await
    }

    pub async fn play_from_search(
        &self,
        query: impl Into<String>,
        focus: SearchFocus,
    ) -> Result<()> {
        self.send(SessionCommand::PlayFromSearch { query: query.into(), focus }).await
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.send(SessionCommand::SkipToNext).await
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        self.send(SessionCommand::SkipToPrevious).await
    }

    pub async fn skip_to_queue_item(&self, stable_id: u64) -> Result<()> {
        self.send(SessionCommand::SkipToQueueItem { stable_id }).await
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.send(SessionCommand::SeekTo { position_ms }).await
    }

    /// Append a category or insert a single track. With `play_next` a
    /// single track lands right after the current entry.
    pub async fn add_to_queue(&self, media_id: MediaId, play_next: bool) -> Result<()> {
        self.send(SessionCommand::AddToQueue { media_id, play_next }).await
    }

    pub async fn remove_from_queue(&self, stable_id: u64) -> Result<()> {
        self.send(SessionCommand::RemoveFromQueue { stable_id }).await
    }

    pub async fn swap_queue_items(&self, pos_a: usize, pos_b: usize) -> Result<()> {
        self.send(SessionCommand::SwapQueueItems { pos_a, pos_b }).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.send(SessionCommand::ToggleShuffle).await
    }

    pub async fn toggle_repeat(&self) -> Result<()> {
        self.send(SessionCommand::ToggleRepeat).await
    }

    /// Replace the playback engine, carrying playback across.
    pub async fn switch_engine(&self, engine: Arc<dyn PlaybackEngine>) -> Result<()> {
        self.send(SessionCommand::SwitchEngine { engine }).await
    }

    /// Remove a track from the catalog and scrub it from the queue.
    pub async fn delete_track(&self, track_id: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::DeleteTrack { track_id: track_id.into() }).await
    }

    /// Snapshot of the consolidated state plus the live playback position.
    pub async fn current(&self) -> Result<StateSnapshot> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::CurrentState { reply }).await?;
        answer.await.map_err(|_| SessionError::MailboxClosed)
    }

    /// Snapshot of the queue contents.
    pub async fn queue(&self) -> Result<QueueView> {
        let (reply, answer) = oneshot::channel();
        self.send(SessionCommand::QueueSnapshot { reply }).await?;
        answer.await.map_err(|_| SessionError::MailboxClosed)
    }

    /// Ask the controller to stop playback and exit. Commands sent after
    /// this fail with [`SessionError::MailboxClosed`] once it winds down.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::MailboxClosed)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}
