//! Session controller
//!
//! ## Overview
//!
//! The controller is the single writer for all session state. It owns the
//! queue, the current index, the mode flags and the engine binding, and it
//! consumes exactly one input at a time: either a command from the mailbox
//! or a signal from the engine. Nothing else mutates session state, so no
//! handler ever observes another handler half-done.
//!
//! ## Architecture
//!
//! ```text
//!  SessionHandle ──commands──▶ ┌──────────────────┐ ──publishes──▶ watch<SessionState>
//!                              │ SessionController │ ──emits─────▶ EventBus
//!  PlaybackEngine ──signals──▶ └──────────────────┘ ──drives────▶ PlaybackEngine
//! ```
//!
//! The idle timer runs inside the same loop: any non-query command (and
//! any stop or pause) pushes the deadline out, and when it fires while
//! nothing is playing the controller deactivates itself and exits.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use core_catalog::{CatalogProvider, CategoryPath, MediaId};
use core_runtime::events::{
    CatalogEvent, CoreEvent, EngineEvent, EventBus, QueueEvent, SessionEvent,
};
use engine_traits::{
    signal_channel, EngineSignal, PlaybackEngine, PlaybackMetadata, PlaybackRequest,
    PlaybackState, SignalSink, SignalStream,
};

use crate::builder;
use crate::commands::{SearchFocus, SessionCommand};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::queue::{PlayQueue, QueueView};
use crate::state::{
    AvailableActions, CurrentTrack, RepeatMode, SessionId, SessionState, StateSnapshot,
};

pub(crate) struct SessionController {
    session_id: SessionId,
    config: SessionConfig,
    catalog: Arc<CatalogProvider>,
    engine: Arc<dyn PlaybackEngine>,
    events: EventBus,
    state_tx: watch::Sender<SessionState>,
    mailbox: mpsc::Receiver<SessionCommand>,
    signals: SignalStream,
    /// Kept for rebinding when the engine is switched
    signal_tx: SignalSink,
    queue: PlayQueue,
    current_index: Option<usize>,
    shuffling: bool,
    repeat: RepeatMode,
    active: bool,
    /// Published instead of the engine state while it is set; used for
    /// Connecting during catalog loads, Stopped after seeding an empty
    /// queue, and Error after a stop-with-reason
    state_override: Option<PlaybackState>,
    idle_deadline: Instant,
}

impl SessionController {
    /// Wire up a controller and hand back the channel ends its owner
    /// keeps: the command sender, the state receiver, and the signal sink
    /// to bind into the first engine.
    pub(crate) fn new(
        config: SessionConfig,
        catalog: Arc<CatalogProvider>,
        engine: Arc<dyn PlaybackEngine>,
        events: EventBus,
    ) -> (
        Self,
        mpsc::Sender<SessionCommand>,
        watch::Receiver<SessionState>,
        SignalSink,
    ) {
        let session_id = SessionId::new();
        let (command_tx, mailbox) = mpsc::channel(config.mailbox_capacity);
        let (state_tx, state_rx) = watch::channel(SessionState::initial(session_id, engine.name()));
        let (signal_tx, signals) = signal_channel();
        let idle_deadline = Instant::now() + config.idle_stop_delay;

        let controller = Self {
            session_id,
            config,
            catalog,
            engine,
            events,
            state_tx,
            mailbox,
            signals,
            signal_tx: signal_tx.clone(),
            queue: PlayQueue::empty(),
            current_index: None,
            shuffling: false,
            repeat: RepeatMode::None,
            active: false,
            state_override: None,
            idle_deadline,
        };
        (controller, command_tx, state_rx, signal_tx)
    }

    pub(crate) fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Consume commands and engine signals until shut down, every handle
    /// is dropped, or the idle timer fires while nothing plays.
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    pub(crate) async fn run(mut self) {
        info!(engine = self.engine.name(), "Session controller running");
        loop {
            let idle = tokio::time::sleep_until(self.idle_deadline);
            tokio::pin!(idle);
            tokio::select! {
                command = self.mailbox.recv() => match command {
                    Some(SessionCommand::Shutdown) => {
                        self.deactivate("shutdown requested").await;
                        break;
                    }
                    Some(command) => {
                        let is_query = command.is_query();
                        self.handle_command(command).await;
                        self.publish_state();
                        if !is_query {
                            self.touch_idle();
                        }
                    }
                    None => {
                        self.deactivate("all handles dropped").await;
                        break;
                    }
                },
                Some(signal) = self.signals.recv() => {
                    self.handle_signal(signal).await;
                    self.publish_state();
                }
                _ = &mut idle => {
                    if self.engine.is_playing() {
                        self.touch_idle();
                        continue;
                    }
                    self.deactivate("idle timeout").await;
                    break;
                }
            }
        }
        info!("Session controller stopped");
    }

    // ========================================================================
    // Command handling
    // ========================================================================

    async fn handle_command(&mut self, command: SessionCommand) {
        debug!(command = command.name(), "Handling command");
        match command {
            SessionCommand::Play => self.handle_play().await,
            SessionCommand::Pause => self.handle_pause().await,
            SessionCommand::Stop { error } => self.handle_stop(error).await,
            SessionCommand::PlayFromId { media_id, shuffle } => {
                self.handle_play_from_id(media_id, shuffle).await
            }
            SessionCommand::PlayFromSearch { query, focus } => {
                self.handle_play_from_search(query, focus).await
            }
            SessionCommand::SkipToNext => self.handle_skip_next().await,
            SessionCommand::SkipToPrevious => self.handle_skip_previous().await,
            SessionCommand::SkipToQueueItem { stable_id } => {
                self.handle_skip_to_item(stable_id).await
            }
            SessionCommand::SeekTo { position_ms } => self.handle_seek(position_ms).await,
            SessionCommand::AddToQueue { media_id, play_next } => {
                self.handle_add_to_queue(media_id, play_next).await
            }
            SessionCommand::RemoveFromQueue { stable_id } => {
                self.handle_remove_from_queue(stable_id).await
            }
            SessionCommand::SwapQueueItems { pos_a, pos_b } => self.handle_swap(pos_a, pos_b),
            SessionCommand::ToggleShuffle => self.handle_toggle_shuffle(),
            SessionCommand::ToggleRepeat => self.handle_toggle_repeat(),
            SessionCommand::SwitchEngine { engine } => self.handle_switch_engine(engine).await,
            SessionCommand::DeleteTrack { track_id } => self.handle_delete_track(track_id).await,
            SessionCommand::CurrentState { reply } => {
                let snapshot = StateSnapshot {
                    state: self.compose_state(),
                    position_ms: self.engine.position_ms(),
                };
                let _ = reply.send(snapshot);
            }
            SessionCommand::QueueSnapshot { reply } => {
                let view = QueueView {
                    title: self.queue.title().to_string(),
                    current_index: self.current_index,
                    entries: self.queue.entries().to_vec(),
                };
                let _ = reply.send(view);
            }
            // Handled by the run loop before dispatch
            SessionCommand::Shutdown => {}
        }
    }

    async fn handle_play(&mut self) {
        if self.queue.is_empty() {
            if !self.ensure_catalog().await {
                return;
            }
            let queue =
                match builder::random_queue(&self.catalog, &self.config.random_queue_title).await {
                    Ok(queue) => queue,
                    Err(e) => {
                        self.handle_stop(Some(format!("Cannot build a queue: {}", e))).await;
                        return;
                    }
                };
            if queue.is_empty() {
                // An empty sample leaves the session exactly as it was
                debug!("Random sample came back empty");
                return;
            }
            self.install_queue(queue, None);
            self.play_at(0, true).await;
            return;
        }
        let index = self.current_index.unwrap_or(0);
        self.current_index = Some(index);
        self.play_at(index, false).await;
    }

    async fn handle_pause(&mut self) {
        if self.engine.is_playing() {
            if let Err(e) = self.engine.pause().await {
                warn!(error = %e, "Engine pause failed");
            }
        }
        self.touch_idle();
    }

    /// Stop playback. With a message, the published state becomes an
    /// error carrying it; the queue survives either way so a later Play
    /// resumes where the session left off.
    async fn handle_stop(&mut self, error: Option<String>) {
        if let Err(e) = self.engine.stop(false).await {
            warn!(error = %e, "Engine stop failed");
        }
        self.active = false;
        self.state_override = error.map(|message| {
            warn!(message, "Playback stopped with error");
            PlaybackState::Error { message }
        });
        self.touch_idle();
    }

    async fn handle_play_from_id(&mut self, media_id: MediaId, shuffle: bool) {
        if !self.ensure_catalog().await {
            return;
        }
        let mut queue = match builder::queue_for_category(&self.catalog, &media_id.category).await {
            Ok(queue) => queue,
            Err(e) => {
                self.handle_stop(Some(format!("Cannot play {}: {}", media_id, e))).await;
                return;
            }
        };
        if shuffle {
            // One-shot shuffle of the built order; shuffle mode stays off
            queue.shuffle_all(&mut rand::thread_rng());
        }
        let target = media_id
            .track_id
            .as_deref()
            .and_then(|track_id| queue.position_of_track(track_id));
        self.install_queue(queue, target);

        if self.queue.is_empty() {
            self.handle_stop(Some(format!("Nothing to play for {}", media_id))).await;
            return;
        }
        if media_id.track_id.is_some() && target.is_none() {
            debug!(media_id = %media_id, "Requested track is not in the built queue");
            return;
        }
        self.play_at(self.current_index.unwrap_or(0), true).await;
    }

    async fn handle_play_from_search(&mut self, query: String, focus: SearchFocus) {
        if !self.ensure_catalog().await {
            return;
        }
        let unfocused = query.trim().is_empty() || focus == SearchFocus::Any;
        let built = if unfocused {
            builder::random_queue(&self.catalog, &self.config.random_queue_title).await
        } else {
            builder::search_queue(&self.catalog, &query, focus).await
        };
        match built {
            Ok(queue) => self.install_queue(queue, None),
            Err(e) => {
                self.handle_stop(Some(format!("Search failed: {}", e))).await;
                return;
            }
        }
        if self.queue.is_empty() {
            let message = if unfocused {
                "Nothing to play".to_string()
            } else {
                format!("No search results for '{}'", query.trim())
            };
            self.handle_stop(Some(message)).await;
            return;
        }
        self.play_at(0, true).await;
    }

    async fn handle_skip_next(&mut self) {
        match self.current_index {
            Some(index) if !self.queue.is_empty() => {
                // Past the last entry, skipping wraps to the front
                let next = if index + 1 >= self.queue.len() { 0 } else { index + 1 };
                self.current_index = Some(next);
                self.play_at(next, true).await;
            }
            _ => self.handle_stop(Some("Cannot skip: the queue is empty".to_string())).await,
        }
    }

    async fn handle_skip_previous(&mut self) {
        match self.current_index {
            Some(index) if !self.queue.is_empty() => {
                // At the first entry, skipping back restarts it
                let previous = index.saturating_sub(1);
                self.current_index = Some(previous);
                self.play_at(previous, true).await;
            }
            _ => self.handle_stop(Some("Cannot skip: the queue is empty".to_string())).await,
        }
    }

    async fn handle_skip_to_item(&mut self, stable_id: u64) {
        match self.queue.position_of_stable(stable_id) {
            Some(pos) => {
                self.current_index = Some(pos);
                self.play_at(pos, true).await;
            }
            None => warn!(stable_id, "No queue entry with this id"),
        }
    }

    async fn handle_seek(&mut self, position_ms: u64) {
        if self.current_index.is_none() {
            warn!(position_ms, "Ignoring seek with no current entry");
            return;
        }
        if let Err(e) = self.engine.seek_to(position_ms).await {
            self.events.emit(CoreEvent::Engine(EngineEvent::Fault { message: e.to_string() })).ok();
            self.handle_stop(Some(e.to_string())).await;
        }
    }

    async fn handle_add_to_queue(&mut self, media_id: MediaId, play_next: bool) {
        if !self.ensure_catalog().await {
            return;
        }
        let was_empty = self.queue.is_empty();
        // Resolutions land right after the current entry with play_next,
        // at the end otherwise
        let insert_pos = if play_next {
            self.current_index.map(|i| i + 1).unwrap_or(self.queue.len())
        } else {
            self.queue.len()
        };
        match &media_id.track_id {
            Some(track_id) => {
                let track = match self.catalog.track(track_id).await {
                    Ok(track) => track,
                    Err(e) => {
                        warn!(media_id = %media_id, error = %e, "Cannot add unknown track");
                        return;
                    }
                };
                let stable_id = self.queue.insert_single(track, insert_pos);
                self.events.emit(CoreEvent::Queue(QueueEvent::EntryAdded {
                    stable_id,
                    track_id: track_id.clone(),
                    play_next,
                })).ok();
                if was_empty {
                    self.queue.set_title(CategoryPath::Queue.label());
                }
            }
            None => {
                let tracks =
                    match builder::tracks_for_category(&self.catalog, &media_id.category).await {
                        Ok(tracks) => tracks,
                        Err(e) => {
                            warn!(media_id = %media_id, error = %e, "Cannot resolve category");
                            return;
                        }
                    };
                if tracks.is_empty() {
                    debug!(media_id = %media_id, "Category resolved to no tracks");
                    return;
                }
                let range = self.queue.insert_tracks(&media_id.category, tracks, insert_pos);
                if self.shuffling {
                    self.queue.shuffle_range(range.clone(), &mut rand::thread_rng());
                }
                for entry in &self.queue.entries()[range] {
                    self.events.emit(CoreEvent::Queue(QueueEvent::EntryAdded {
                        stable_id: entry.stable_id,
                        track_id: entry.track.id.clone(),
                        play_next,
                    })).ok();
                }
                if was_empty {
                    let title =
                        builder::title_for_category(&self.catalog, &media_id.category).await;
                    self.queue.set_title(title);
                }
            }
        }
        // Seeding an empty queue selects the first entry and publishes it
        // as stopped; playback starts only on an explicit Play
        if was_empty && !self.queue.is_empty() {
            self.current_index = Some(0);
            self.state_override = Some(PlaybackState::Stopped);
        }
    }

    async fn handle_remove_from_queue(&mut self, stable_id: u64) {
        let Some(pos) = self.queue.position_of_stable(stable_id) else {
            warn!(stable_id, "No queue entry with this id");
            return;
        };
        let removed_current = self.current_index == Some(pos);
        self.queue.remove_at(pos);
        self.events.emit(CoreEvent::Queue(QueueEvent::EntryRemoved { stable_id })).ok();
        if let Some(current) = self.current_index {
            if pos < current {
                self.current_index = Some(current - 1);
            }
        }
        self.settle_after_removal(removed_current).await;
    }

    fn handle_swap(&mut self, pos_a: usize, pos_b: usize) {
        if pos_a == pos_b || !self.queue.swap(pos_a, pos_b) {
            warn!(pos_a, pos_b, "Ignoring invalid swap");
            return;
        }
        self.current_index = match self.current_index {
            Some(current) if current == pos_a => Some(pos_b),
            Some(current) if current == pos_b => Some(pos_a),
            other => other,
        };
        self.events.emit(CoreEvent::Queue(QueueEvent::EntriesSwapped { pos_a, pos_b })).ok();
    }

    fn handle_toggle_shuffle(&mut self) {
        self.shuffling = !self.shuffling;
        if let Some(current) = self.current_index {
            if self.shuffling {
                self.current_index =
                    Some(self.queue.reshuffle_keeping(current, &mut rand::thread_rng()));
            } else if let Some(entry) = self.queue.entry(current) {
                let stable_id = entry.stable_id;
                self.current_index = self.queue.restore_order(stable_id);
            }
        }
        self.events
            .emit(CoreEvent::Queue(QueueEvent::ShuffleChanged { shuffling: self.shuffling })).ok();
    }

    fn handle_toggle_repeat(&mut self) {
        self.repeat = self.repeat.cycled();
        self.events.emit(CoreEvent::Queue(QueueEvent::RepeatChanged {
            mode: self.repeat.as_str().to_string(),
        })).ok();
    }

    /// Hand playback to a new engine, carrying position, track and mode
    /// across. The outgoing engine is stopped silently; the controller
    /// republishes state itself once the incoming engine settles.
    async fn handle_switch_engine(&mut self, next: Arc<dyn PlaybackEngine>) {
        let from = self.engine.name().to_string();
        let to = next.name().to_string();
        info!(from, to, "Switching playback engine");

        let old_state = self.engine.state();
        let position_ms = self.engine.position_ms();
        let track_id = self.engine.current_track_id();

        if let Err(e) = self.engine.stop(false).await {
            warn!(error = %e, "Outgoing engine stop failed");
        }
        next.bind(self.signal_tx.clone());
        next.set_position_ms(position_ms);
        next.set_current_track_id(track_id);
        if let Err(e) = next.start().await {
            // Sever the rejected engine so its signals cannot reach the
            // session; the old engine stays bound and usable
            next.bind(SignalSink::disconnected());
            self.events.emit(CoreEvent::Engine(EngineEvent::Fault { message: e.to_string() })).ok();
            self.handle_stop(Some(format!("Engine switch to {} failed: {}", to, e))).await;
            return;
        }
        self.engine = next;
        self.events.emit(CoreEvent::Engine(EngineEvent::Switched { from, to })).ok();

        match old_state {
            PlaybackState::Connecting | PlaybackState::Buffering | PlaybackState::Paused => {
                if let Err(e) = self.engine.pause().await {
                    warn!(error = %e, "Pause after engine switch failed");
                }
            }
            PlaybackState::Playing => match self.current_index {
                Some(pos) if !self.queue.is_empty() => self.play_at(pos, false).await,
                _ => self.handle_stop(None).await,
            },
            _ => {}
        }
    }

    async fn handle_delete_track(&mut self, track_id: String) {
        if !self.ensure_catalog().await {
            return;
        }
        match self.catalog.delete_track(&track_id).await {
            Ok(true) => {}
            Ok(false) => debug!(track_id, "Track already absent from catalog"),
            Err(e) => {
                warn!(track_id, error = %e, "Catalog delete failed");
                return;
            }
        }
        let mut removed_current = false;
        while let Some(pos) = self.queue.position_of_track(&track_id) {
            if let Some(entry) = self.queue.remove_at(pos) {
                self.events
                    .emit(CoreEvent::Queue(QueueEvent::EntryRemoved { stable_id: entry.stable_id })).ok();
            }
            match self.current_index {
                Some(current) if pos == current => removed_current = true,
                Some(current) if pos < current => self.current_index = Some(current - 1),
                _ => {}
            }
        }
        self.settle_after_removal(removed_current).await;
    }

    // ========================================================================
    // Signal handling
    // ========================================================================

    async fn handle_signal(&mut self, signal: EngineSignal) {
        match signal {
            EngineSignal::Completed => self.handle_completion().await,
            EngineSignal::StateChanged { state } => {
                debug!(state = %state, "Engine state changed");
            }
            EngineSignal::Error { message } => {
                self.events
                    .emit(CoreEvent::Engine(EngineEvent::Fault { message: message.clone() })).ok();
                self.handle_stop(Some(message)).await;
            }
            EngineSignal::TrackLoaded { track_id } => self.handle_track_loaded(track_id).await,
        }
    }

    async fn handle_completion(&mut self) {
        debug!(repeat = %self.repeat, "Track completed");
        match self.repeat {
            RepeatMode::One => match self.current_index {
                Some(pos) if !self.queue.is_empty() => self.play_at(pos, true).await,
                _ => self.handle_stop(None).await,
            },
            RepeatMode::All => match self.current_index {
                Some(index) if !self.queue.is_empty() => {
                    let next = (index + 1) % self.queue.len();
                    self.current_index = Some(next);
                    self.play_at(next, true).await;
                }
                _ => self.handle_stop(None).await,
            },
            RepeatMode::None => match self.current_index {
                Some(index) if index + 1 < self.queue.len() => {
                    self.current_index = Some(index + 1);
                    self.play_at(index + 1, true).await;
                }
                _ => self.handle_stop(None).await,
            },
        }
    }

    /// An engine announced a track of its own accord (a remote receiver
    /// changing tracks). Adopt it: rebuild the queue from the announced
    /// id's category and move the current index to it if found.
    async fn handle_track_loaded(&mut self, loaded: String) {
        let already_current = self
            .current_index
            .and_then(|pos| self.queue.entry(pos))
            .map(|entry| entry.media_id.to_string() == loaded)
            .unwrap_or(false);
        if already_current {
            return;
        }
        let media_id = match MediaId::parse(&loaded) {
            Ok(media_id) => media_id,
            Err(_) => {
                // Engines that only track bare ids can still be adopted
                // when the track already sits in the queue
                match self.queue.position_of_track(&loaded) {
                    Some(pos) => self.current_index = Some(pos),
                    None => debug!(loaded, "Ignoring unknown loaded track"),
                }
                return;
            }
        };
        let Some(track_id) = media_id.track_id.clone() else {
            return;
        };
        if !self.catalog.is_ready().await {
            debug!("Catalog not ready, ignoring loaded track");
            return;
        }
        let mut rebuilt = match builder::queue_for_category(&self.catalog, &media_id.category).await
        {
            Ok(queue) => queue,
            Err(e) => {
                debug!(error = %e, "Cannot rebuild queue for loaded track");
                return;
            }
        };
        match rebuilt.position_of_track(&track_id) {
            Some(pos) => {
                if !self.queue.title().is_empty() {
                    rebuilt.set_title(self.queue.title().to_string());
                }
                self.queue = rebuilt;
                self.current_index = Some(pos);
                self.events.emit(CoreEvent::Queue(QueueEvent::Replaced {
                    title: self.queue.title().to_string(),
                    entries: self.queue.len(),
                })).ok();
            }
            None => debug!(track_id, "Loaded track not found in rebuilt queue"),
        }
    }

    // ========================================================================
    // Shared behavior
    // ========================================================================

    /// Load the catalog if needed, publishing Connecting while it loads.
    /// Returns false (after stopping with a message) when the load fails.
    async fn ensure_catalog(&mut self) -> bool {
        if self.catalog.is_ready().await {
            return true;
        }
        self.events.emit(CoreEvent::Catalog(CatalogEvent::LoadStarted)).ok();
        self.state_override = Some(PlaybackState::Connecting);
        self.publish_state();
        match self.catalog.ensure_ready().await {
            Ok(tracks) => {
                self.state_override = None;
                self.events.emit(CoreEvent::Catalog(CatalogEvent::Ready { tracks })).ok();
                true
            }
            Err(e) => {
                self.events
                    .emit(CoreEvent::Catalog(CatalogEvent::LoadFailed { message: e.to_string() })).ok();
                self.state_override = None;
                self.handle_stop(Some(format!("Catalog unavailable: {}", e))).await;
                false
            }
        }
    }

    /// Install a freshly built queue. Wholesale replacement resets the
    /// shuffle and repeat flags; queue edits never do.
    fn install_queue(&mut self, queue: PlayQueue, index: Option<usize>) {
        self.shuffling = false;
        self.repeat = RepeatMode::None;
        self.queue = queue;
        self.current_index = if self.queue.is_empty() {
            None
        } else {
            Some(index.unwrap_or(0).min(self.queue.len() - 1))
        };
        self.events.emit(CoreEvent::Queue(QueueEvent::Replaced {
            title: self.queue.title().to_string(),
            entries: self.queue.len(),
        })).ok();
    }

    /// Start playing the entry at a queue position. With `from_start`
    /// false the engine resumes at its retained position when the entry
    /// is the one it already has loaded.
    async fn play_at(&mut self, index: usize, from_start: bool) {
        let Some(entry) = self.queue.entry(index) else {
            warn!(index, "No queue entry at this position");
            return;
        };
        let media_id = entry.media_id.to_string();
        let expected_track = entry.track.id.clone();

        if !self.ensure_catalog().await {
            return;
        }
        let track = match self.catalog.track(&expected_track).await {
            Ok(track) => track,
            Err(e) => {
                self.handle_stop(Some(format!("Cannot play {}: {}", expected_track, e))).await;
                return;
            }
        };
        if track.id != expected_track {
            let err = SessionError::Integrity { expected: expected_track, actual: track.id };
            error!(error = %err, "Aborting play");
            debug_assert!(false, "{}", err);
            return;
        }

        let resume =
            !from_start && self.engine.current_track_id().as_deref() == Some(media_id.as_str());
        let start_ms = if resume { self.engine.position_ms() } else { 0 };

        self.activate();
        self.state_override = None;
        self.engine.set_current_track_id(Some(media_id));

        let mut metadata = PlaybackMetadata::new(track.id.clone(), track.title.clone())
            .with_artist(track.artist.clone())
            .with_album(track.album.clone());
        if track.duration_ms > 0 {
            metadata = metadata.with_duration_ms(track.duration_ms);
        }
        let mut request = PlaybackRequest::new(metadata).with_start_position(start_ms);
        if let Some(source) = track.source.clone() {
            request = request.with_source(source);
        }
        if let Err(e) = self.engine.play(request).await {
            self.events.emit(CoreEvent::Engine(EngineEvent::Fault { message: e.to_string() })).ok();
            self.handle_stop(Some(e.to_string())).await;
        }
    }

    /// After entries were removed: play the successor when the current
    /// entry went away and one exists, otherwise stop.
    async fn settle_after_removal(&mut self, removed_current: bool) {
        if self.queue.is_empty() {
            self.current_index = None;
            if removed_current {
                self.handle_stop(None).await;
            }
            return;
        }
        if !removed_current {
            return;
        }
        let pos = self.current_index.unwrap_or(0);
        if pos < self.queue.len() {
            self.current_index = Some(pos);
            self.play_at(pos, true).await;
        } else {
            self.current_index = Some(self.queue.len() - 1);
            self.handle_stop(None).await;
        }
    }

    fn activate(&mut self) {
        if !self.active {
            self.active = true;
            self.events.emit(CoreEvent::Session(SessionEvent::Activated {
                session_id: self.session_id.to_string(),
            })).ok();
        }
    }

    async fn deactivate(&mut self, reason: &str) {
        info!(reason, "Deactivating session");
        self.handle_stop(None).await;
        if !self.queue.is_empty() {
            self.queue = PlayQueue::empty();
            self.current_index = None;
            self.events
                .emit(CoreEvent::Queue(QueueEvent::Cleared { reason: reason.to_string() })).ok();
        }
        self.events.emit(CoreEvent::Session(SessionEvent::Deactivated {
            session_id: self.session_id.to_string(),
            reason: reason.to_string(),
        })).ok();
        self.publish_state();
    }

    fn touch_idle(&mut self) {
        self.idle_deadline = Instant::now() + self.config.idle_stop_delay;
    }

    // ========================================================================
    // State publication
    // ========================================================================

    fn compose_state(&self) -> SessionState {
        let playback =
            self.state_override.clone().unwrap_or_else(|| self.engine.state());
        let track = self.current_index.and_then(|index| {
            self.queue.entry(index).map(|entry| CurrentTrack {
                track_id: entry.track.id.clone(),
                title: entry.track.title.clone(),
                artist: entry.track.artist.clone(),
                album: entry.track.album.clone(),
                duration_ms: entry.track.duration_ms,
                index,
            })
        });
        SessionState {
            session_id: self.session_id,
            active: self.active,
            actions: AvailableActions::for_position(
                playback.is_playing(),
                self.current_index,
                self.queue.len(),
            ),
            playback,
            track,
            queue_title: self.queue.title().to_string(),
            queue: self.queue.entries().to_vec(),
            shuffling: self.shuffling,
            repeat: self.repeat,
            engine: self.engine.name().to_string(),
        }
    }

    /// Publish the consolidated state if it changed, emitting the
    /// matching discrete events for playback and track transitions.
    fn publish_state(&self) {
        let new = self.compose_state();
        let old = self.state_tx.borrow().clone();
        if old == new {
            return;
        }
        if old.playback != new.playback {
            self.events.emit(CoreEvent::Session(SessionEvent::StateChanged {
                state: new.playback.clone(),
            })).ok();
        }
        if old.track != new.track {
            if let Some(track) = &new.track {
                self.events.emit(CoreEvent::Session(SessionEvent::TrackChanged {
                    track_id: track.track_id.clone(),
                    title: track.title.clone(),
                    index: track.index,
                })).ok();
            }
        }
        let _ = self.state_tx.send(new);
    }
}
